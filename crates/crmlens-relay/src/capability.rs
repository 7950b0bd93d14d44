//! Host-page capability probing.
//!
//! The CRM page exposes a script global from which version and
//! current-record context are read. It appears at some point after
//! navigation, so readiness is polled with a short bounded retry. The
//! capability itself is opaque; nothing here reimplements it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crmlens_core::{poll_until, PollConfig, PollError};

/// The host page's script global, as far as the relay cares.
#[async_trait]
pub trait HostCapability: Send + Sync {
    /// Whether the global is attached and answering.
    async fn is_ready(&self) -> bool;

    /// Platform version string, once ready.
    async fn version(&self) -> Option<String>;

    /// Current page context (entity name, record id, form state).
    async fn page_context(&self) -> Option<Value>;
}

/// Bounded-retry wrapper around a [`HostCapability`].
pub struct CapabilityProbe<H: HostCapability> {
    capability: Arc<H>,
    retry: PollConfig,
}

impl<H: HostCapability> CapabilityProbe<H> {
    pub fn new(capability: Arc<H>, retry: PollConfig) -> Self {
        Self { capability, retry }
    }

    /// Wait until the capability answers, within the retry budget.
    pub async fn wait_ready(&self) -> Result<(), PollError> {
        poll_until(&self.retry, || async {
            self.capability.is_ready().await.then_some(())
        })
        .await
    }

    /// Read the page context, or `None` when the capability is absent.
    ///
    /// Never fails: a page that has not attached its global yet is a normal
    /// state, reported as "no context".
    pub async fn page_context(&self) -> Option<Value> {
        if self.wait_ready().await.is_err() {
            debug!("host capability never became ready, reporting no context");
            return None;
        }
        self.capability.page_context().await
    }
}
