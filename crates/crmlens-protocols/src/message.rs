//! Message envelopes crossing context boundaries.
//!
//! Two wire shapes exist, one per boundary:
//!
//! - **ActionRequest / ActionResponse**: UI context → background service.
//!   Every reply is an `ActionResponse`, including failures — the transport
//!   must never propagate an exception to a context that cannot observe it.
//! - **BridgeMessage**: content relay ↔ host page script context. A closed
//!   tagged union discriminated by `type`, so unknown shapes fail to parse
//!   instead of being half-handled.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// A request from the UI context to the background service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action name, e.g. `admin:start-impersonation`.
    pub action: String,
    /// Action payload. Opaque to the router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Correlation id, present when the caller wants the reply matched
    /// across more than one hop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ActionRequest {
    /// Create a request with no payload.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            data: None,
            request_id: None,
        }
    }

    /// Attach a payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a correlation id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// The normalized reply shape for every dispatched action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    /// Successful reply carrying a payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Successful reply with no payload.
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// Failed reply carrying an error message.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Message exchanged between the content relay and the host page context.
///
/// Discriminated by `type` on the wire (`REQUEST` / `RESPONSE`). The relay
/// matches exhaustively; payloads that do not parse into one of these
/// variants are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    /// Relay → page: run a host-page action.
    #[serde(rename = "REQUEST")]
    Request {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    /// Page → relay: the reply for a previously forwarded request.
    #[serde(rename = "RESPONSE")]
    Response {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl BridgeMessage {
    /// The correlation id this message carries.
    pub fn request_id(&self) -> &str {
        match self {
            BridgeMessage::Request { request_id, .. } => request_id,
            BridgeMessage::Response { request_id, .. } => request_id,
        }
    }
}
