//! Correlation registry: pairing asynchronous requests with their replies.
//!
//! Every context that sends a request across a boundary and awaits a reply
//! from another context owns one of these. Replies are matched strictly by
//! request id; no ordering exists between distinct in-flight requests.
//!
//! The registry imposes no timeout. Callers that need bounded latency race
//! their receiver against [`tokio::time::timeout`]; a reply landing after
//! the caller gave up hits a dropped receiver and is discarded, which is
//! the same observable outcome as [`CorrelationRegistry::resolve`] on an
//! unknown id: a silent no-op.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, Entry};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;

/// Registry of pending reply continuations, keyed by request id.
pub struct CorrelationRegistry {
    pending: DashMap<String, oneshot::Sender<Value>>,
    counter: AtomicU64,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            counter: AtomicU64::new(0),
        }
    }

    /// Generate a request id unique within this browsing session: a
    /// monotonic counter combined with a millisecond timestamp.
    pub fn next_request_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("req_{}_{}", n, chrono::Utc::now().timestamp_millis())
    }

    /// Register a pending continuation under a caller-supplied id.
    ///
    /// Returns `None` if the id is already registered — the remedy is a
    /// fresh id, never reuse. The existing continuation is left untouched.
    pub fn issue(&self, request_id: &str) -> Option<oneshot::Receiver<Value>> {
        // Entry holds the shard lock, so a racing duplicate cannot slip in
        // between the check and the insert and displace the first sender.
        match self.pending.entry(request_id.to_string()) {
            Entry::Occupied(_) => {
                warn!(request_id, "duplicate request id, refusing to issue");
                None
            }
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(tx);
                Some(rx)
            }
        }
    }

    /// Generate a fresh id and register a continuation for it in one step.
    pub fn begin(&self) -> (String, oneshot::Receiver<Value>) {
        loop {
            let id = self.next_request_id();
            if let Some(rx) = self.issue(&id) {
                return (id, rx);
            }
        }
    }

    /// Fire and remove the continuation for `request_id`.
    ///
    /// Unknown id (late, duplicate, or already-resolved reply) is a silent
    /// no-op; that is normal operation, not an error.
    pub fn resolve(&self, request_id: &str, payload: Value) {
        match self.pending.remove(request_id) {
            Some((_, tx)) => {
                // The caller may have given up and dropped its receiver.
                if tx.send(payload).is_err() {
                    debug!(request_id, "reply arrived after caller gave up");
                }
            }
            None => debug!(request_id, "reply for unknown request id, ignoring"),
        }
    }

    /// Drop a pending continuation without firing it.
    pub fn abandon(&self, request_id: &str) {
        self.pending.remove(request_id);
    }

    /// Whether `request_id` is still awaiting a reply.
    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Number of requests currently awaiting replies.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
