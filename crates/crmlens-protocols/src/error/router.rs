//! Message router errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    /// Dispatch named an action nothing has registered for.
    #[error("No handler registered for action: {0}")]
    NoHandler(String),

    /// The router was torn down with requests still queued.
    #[error("Router queue closed before dispatch")]
    QueueClosed,
}
