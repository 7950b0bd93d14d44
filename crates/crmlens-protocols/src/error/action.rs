//! Action handler errors.

use thiserror::Error;

/// Failure inside a registered action handler.
///
/// Always caught at the dispatch boundary and flattened to a message string
/// in the failed response.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Message(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error(transparent)]
    Impersonation(#[from] super::ImpersonationError),
}

impl ActionError {
    pub fn message(msg: impl Into<String>) -> Self {
        ActionError::Message(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_display_is_bare() {
        let err = ActionError::message("tab not found");
        assert_eq!(err.to_string(), "tab not found");
    }

    #[test]
    fn test_invalid_payload_from_serde() {
        let parse: Result<i64, _> = serde_json::from_str("\"nope\"");
        let err = ActionError::from(parse.unwrap_err());
        assert!(err.to_string().contains("Invalid payload"));
    }
}
