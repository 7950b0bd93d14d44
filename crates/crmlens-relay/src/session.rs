//! Page-scoped session key store.
//!
//! Holds the opaque session key the developer tooling uses against the CRM
//! API, bridged over the same page boundary as everything else. The store
//! is ephemeral: it lives and dies with the page context.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crmlens_protocols::ActionResponse;

/// Commands the privileged side issues against the store.
///
/// Closed union, discriminated by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SessionKeyCommand {
    #[serde(rename = "SET")]
    Set {
        #[serde(rename = "sessionKey")]
        session_key: String,
    },
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "CLEAR")]
    Clear,
}

/// Ephemeral, page-scoped storage for the session key.
#[derive(Default)]
pub struct SessionKeyStore {
    key: RwLock<Option<String>>,
}

impl SessionKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command and produce the wire reply.
    pub fn apply(&self, command: SessionKeyCommand) -> ActionResponse {
        match command {
            SessionKeyCommand::Set { session_key } => {
                debug!("session key set");
                *self.key.write() = Some(session_key);
                ActionResponse::ok_empty()
            }
            SessionKeyCommand::Get => match self.key.read().clone() {
                Some(key) => ActionResponse::ok(json!({ "sessionKey": key })),
                None => ActionResponse::ok_empty(),
            },
            SessionKeyCommand::Clear => {
                debug!("session key cleared");
                *self.key.write() = None;
                ActionResponse::ok_empty()
            }
        }
    }

    /// Direct read, for in-context callers.
    pub fn get(&self) -> Option<String> {
        self.key.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_set_get_clear_cycle() {
        let store = SessionKeyStore::new();

        assert!(store.apply(SessionKeyCommand::Get).data.is_none());

        let resp = store.apply(SessionKeyCommand::Set {
            session_key: "sk-123".to_string(),
        });
        assert!(resp.success);

        let resp = store.apply(SessionKeyCommand::Get);
        assert_eq!(resp.data.unwrap()["sessionKey"], "sk-123");

        let resp = store.apply(SessionKeyCommand::Clear);
        assert!(resp.success);
        assert!(store.get().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let store = SessionKeyStore::new();
        store.apply(SessionKeyCommand::Set {
            session_key: "old".to_string(),
        });
        store.apply(SessionKeyCommand::Set {
            session_key: "new".to_string(),
        });
        assert_eq!(store.get().as_deref(), Some("new"));
    }

    #[test]
    fn test_clear_when_empty_still_succeeds() {
        let store = SessionKeyStore::new();
        assert!(store.apply(SessionKeyCommand::Clear).success);
    }

    #[test]
    fn test_command_wire_tags() {
        let cmd: SessionKeyCommand =
            serde_json::from_value(json!({"type": "SET", "sessionKey": "sk"})).unwrap();
        assert_eq!(
            cmd,
            SessionKeyCommand::Set {
                session_key: "sk".to_string()
            }
        );

        let cmd: SessionKeyCommand = serde_json::from_value(json!({"type": "GET"})).unwrap();
        assert_eq!(cmd, SessionKeyCommand::Get);

        let bad: Result<SessionKeyCommand, _> =
            serde_json::from_value(json!({"type": "DELETE"}));
        assert!(bad.is_err());
    }
}
