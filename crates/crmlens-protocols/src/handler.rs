//! Action handler trait registered with the message router.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

use crate::error::ActionError;

/// Where a dispatched request came from.
///
/// Carried alongside the payload so handlers can scope their effect to the
/// originating tab when the payload itself names none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SenderContext {
    /// Tab the request originated in, when the transport knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
    /// Origin of the sending document, when the transport knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl SenderContext {
    pub fn from_tab(tab_id: i64) -> Self {
        Self {
            tab_id: Some(tab_id),
            origin: None,
        }
    }
}

/// A named action the router can dispatch to.
///
/// Errors returned here are caught at the dispatch boundary and normalized
/// into a failed [`ActionResponse`](crate::ActionResponse); they never cross
/// a context boundary as an exception.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, payload: Value, sender: SenderContext) -> Result<Value, ActionError>;
}

/// Adapter so plain async closures can register as handlers.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Value, SenderContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ActionError>> + Send,
{
    async fn handle(&self, payload: Value, sender: SenderContext) -> Result<Value, ActionError> {
        (self.0)(payload, sender).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_fn_handler_passes_through() {
        let handler = FnHandler(|payload: Value, sender: SenderContext| async move {
            Ok(json!({"echo": payload, "tab": sender.tab_id}))
        });

        let out = handler
            .handle(json!({"k": 1}), SenderContext::from_tab(4))
            .await
            .unwrap();
        assert_eq!(out["echo"]["k"], 1);
        assert_eq!(out["tab"], 4);
    }

    #[tokio::test]
    async fn test_fn_handler_propagates_error() {
        let handler = FnHandler(|_: Value, _: SenderContext| async move {
            Err(ActionError::Message("boom".to_string()))
        });

        let err = handler
            .handle(Value::Null, SenderContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_sender_context_default_is_empty() {
        let ctx = SenderContext::default();
        assert!(ctx.tab_id.is_none());
        assert!(ctx.origin.is_none());
    }
}
