//! The context relay proper.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crmlens_core::{poll_until, CorrelationRegistry, PollConfig, PollError};
use crmlens_protocols::error::RelayError;
use crmlens_protocols::BridgeMessage;

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;

/// Outbound half of the page boundary.
///
/// Implementations must deliver only to a document whose origin equals
/// `target_origin` exactly, never a wildcard. Other same-process frames
/// must not be able to observe or spoof these messages.
#[async_trait]
pub trait PageChannel: Send + Sync {
    /// Post a message into the page script context.
    ///
    /// Returns [`RelayError::NoReceiver`] when the page side has not
    /// attached its listener yet; the relay retries that case.
    async fn post(&self, target_origin: &str, message: BridgeMessage) -> Result<(), RelayError>;
}

/// Bridges privileged requests into the page context and replies back.
///
/// One relay exists per document; it is pinned to the origin of the
/// document it was created in.
pub struct ContextRelay<C: PageChannel> {
    channel: Arc<C>,
    page_origin: String,
    registry: CorrelationRegistry,
    link_retry: PollConfig,
}

impl<C: PageChannel> ContextRelay<C> {
    pub fn new(channel: Arc<C>, page_origin: impl Into<String>) -> Self {
        Self {
            channel,
            page_origin: page_origin.into(),
            registry: CorrelationRegistry::new(),
            link_retry: PollConfig::default(),
        }
    }

    /// Override the bounded-retry policy for a not-yet-listening page.
    pub fn with_link_retry(mut self, link_retry: PollConfig) -> Self {
        self.link_retry = link_retry;
        self
    }

    /// The exact origin this relay posts to.
    pub fn page_origin(&self) -> &str {
        &self.page_origin
    }

    /// Forward a privileged request into the page and await the reply.
    ///
    /// The reply future carries whatever payload the page attached. No
    /// timeout is imposed here; callers needing bounded latency race this
    /// against their own deadline and a late reply is silently dropped.
    pub async fn forward_request(
        &self,
        action: &str,
        data: Option<Value>,
    ) -> Result<Value, RelayError> {
        let (request_id, reply) = self.registry.begin();
        let message = BridgeMessage::Request {
            action: action.to_string(),
            data,
            request_id: request_id.clone(),
        };

        if let Err(e) = self.post_with_retry(message).await {
            self.registry.abandon(&request_id);
            return Err(e);
        }
        debug!(action, request_id, "request forwarded into page");

        reply.await.map_err(|_| RelayError::ChannelClosed)
    }

    /// Deliver an inbound page message.
    ///
    /// Called by the embedder for every message event on the document.
    /// Messages from a foreign origin and payloads that are not a
    /// [`BridgeMessage`] are ignored; a response for an id the relay is not
    /// tracking is ignored too (late replies are normal).
    pub fn handle_page_message(&self, origin: &str, raw: Value) {
        if origin != self.page_origin {
            warn!(origin, expected = %self.page_origin, "dropping message from foreign origin");
            return;
        }

        let message: BridgeMessage = match serde_json::from_value(raw) {
            Ok(m) => m,
            // Pages emit all kinds of unrelated postMessage traffic.
            Err(_) => return,
        };

        match message {
            BridgeMessage::Response { request_id, data } => {
                self.registry.resolve(&request_id, data.unwrap_or(Value::Null));
            }
            // The page never originates requests toward the relay.
            BridgeMessage::Request { action, .. } => {
                debug!(action, "ignoring page-originated request");
            }
        }
    }

    /// Number of forwarded requests still awaiting a page reply.
    pub fn pending_len(&self) -> usize {
        self.registry.pending_len()
    }

    async fn post_with_retry(&self, message: BridgeMessage) -> Result<(), RelayError> {
        let result = poll_until(&self.link_retry, || {
            let message = message.clone();
            async move {
                match self.channel.post(&self.page_origin, message).await {
                    Ok(()) => Some(Ok(())),
                    Err(RelayError::NoReceiver) => None,
                    Err(e) => Some(Err(e)),
                }
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(PollError::Expired { attempts }) => Err(RelayError::TransientLink { attempts }),
        }
    }
}
