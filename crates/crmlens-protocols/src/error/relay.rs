//! Context relay errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The receiving context does not exist yet (page still loading,
    /// service worker not woken). Retried a bounded number of times before
    /// being surfaced.
    #[error("Receiving context unavailable after {attempts} attempts")]
    TransientLink { attempts: u32 },

    /// Inbound page message arrived from an origin the relay is not
    /// bridging for. Discarded, never processed.
    #[error("Message origin {got} does not match page origin {expected}")]
    OriginMismatch { expected: String, got: String },

    /// A single post found no receiver in the page. The relay retries
    /// these; only the exhausted budget surfaces as [`TransientLink`].
    ///
    /// [`TransientLink`]: RelayError::TransientLink
    #[error("No receiving context in the page")]
    NoReceiver,

    /// The underlying page channel was torn down.
    #[error("Page channel closed")]
    ChannelClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
