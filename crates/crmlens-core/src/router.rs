//! Message router for the background service.
//!
//! Dispatches inbound [`ActionRequest`]s by action name to registered
//! handlers. The service worker hosting the router starts asynchronously,
//! so requests can legitimately arrive before any handler exists (a popup
//! that was already open when the worker relaunched). Those requests are
//! queued, never dropped, and dispatched in FIFO arrival order once the
//! router is marked ready.
//!
//! Dispatch never returns an error across the transport boundary: unknown
//! actions and handler failures are both normalized into a failed
//! [`ActionResponse`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crmlens_protocols::error::RouterError;
use crmlens_protocols::{ActionHandler, ActionResponse, SenderContext};

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;

/// Router lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RouterState {
    /// Hosting process not started.
    Uninitialized = 0,
    /// Startup in progress, handlers being registered.
    Registering = 1,
    /// All startup handlers registered; serving directly.
    Ready = 2,
}

impl From<u8> for RouterState {
    fn from(v: u8) -> Self {
        match v {
            1 => RouterState::Registering,
            2 => RouterState::Ready,
            _ => RouterState::Uninitialized,
        }
    }
}

struct QueuedDispatch {
    action: String,
    payload: Value,
    sender: SenderContext,
    reply: oneshot::Sender<ActionResponse>,
}

/// Registry of named action handlers plus the pre-ready request queue.
pub struct MessageRouter {
    state: AtomicU8,
    handlers: DashMap<String, Arc<dyn ActionHandler>>,
    queue: Mutex<VecDeque<QueuedDispatch>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(RouterState::Uninitialized as u8),
            handlers: DashMap::new(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RouterState {
        RouterState::from(self.state.load(Ordering::SeqCst))
    }

    fn is_ready(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RouterState::Ready as u8
    }

    /// Enter the Registering state. Called once when the hosting process
    /// starts wiring up handlers.
    pub fn begin_registration(&self) {
        self.state
            .store(RouterState::Registering as u8, Ordering::SeqCst);
        debug!("router registering");
    }

    /// Register a handler for `action`. Last registration wins.
    ///
    /// Registration after [`mark_ready`](Self::mark_ready) is allowed but
    /// expected only at startup.
    pub fn register_handler(&self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        let action = action.into();
        if self.is_ready() {
            warn!(action, "hot-registering handler on a ready router");
        }
        if self.handlers.insert(action.clone(), handler).is_some() {
            debug!(action, "handler replaced");
        } else {
            debug!(action, "handler registered");
        }
    }

    /// Whether a handler is registered for `action`.
    pub fn has_handler(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Dispatch a request.
    ///
    /// Before Ready the request is queued and the returned future resolves
    /// once the startup drain reaches it. After Ready it is served
    /// directly. The response is always an [`ActionResponse`]; failures are
    /// carried inside it.
    pub async fn dispatch(
        &self,
        action: &str,
        payload: Value,
        sender: SenderContext,
    ) -> ActionResponse {
        let (payload, sender) = if self.is_ready() {
            (payload, sender)
        } else {
            match self.try_enqueue(action, payload, sender) {
                Ok(rx) => {
                    return rx.await.unwrap_or_else(|_| {
                        ActionResponse::err(RouterError::QueueClosed.to_string())
                    });
                }
                // Became ready while we were enqueuing; serve directly.
                Err(unqueued) => unqueued,
            }
        };
        self.dispatch_now(action, payload, sender).await
    }

    /// Queue a pre-ready request, handing back the reply receiver; returns
    /// the untouched payload when the router turned out to be ready.
    fn try_enqueue(
        &self,
        action: &str,
        payload: Value,
        sender: SenderContext,
    ) -> Result<oneshot::Receiver<ActionResponse>, (Value, SenderContext)> {
        let mut queue = self.queue.lock();
        // State may have flipped while we waited for the lock; the drain
        // holds this lock when it flips, so re-checking here guarantees
        // nothing lands in a queue no one will drain.
        if self.is_ready() {
            return Err((payload, sender));
        }
        let (tx, rx) = oneshot::channel();
        queue.push_back(QueuedDispatch {
            action: action.to_string(),
            payload,
            sender,
            reply: tx,
        });
        debug!(action, queued = queue.len(), "request queued before ready");
        Ok(rx)
    }

    /// Drain queued requests in arrival order, then enter Ready.
    ///
    /// Requests arriving during the drain keep queuing (state is still
    /// Registering) and are picked up by the next pass; the flip to Ready
    /// happens under the queue lock, so drain-then-serve ordering holds.
    pub async fn mark_ready(&self) {
        loop {
            let batch: Vec<QueuedDispatch> = {
                let mut queue = self.queue.lock();
                if queue.is_empty() {
                    self.state.store(RouterState::Ready as u8, Ordering::SeqCst);
                    info!("router ready");
                    return;
                }
                queue.drain(..).collect()
            };
            debug!(count = batch.len(), "draining queued requests");
            for item in batch {
                let response = self.dispatch_now(&item.action, item.payload, item.sender).await;
                // Receiver may be gone if the caller timed out while queued.
                let _ = item.reply.send(response);
            }
        }
    }

    async fn dispatch_now(
        &self,
        action: &str,
        payload: Value,
        sender: SenderContext,
    ) -> ActionResponse {
        let Some(handler) = self.handlers.get(action).map(|h| h.clone()) else {
            warn!(action, "dispatch for unregistered action");
            return ActionResponse::err(RouterError::NoHandler(action.to_string()).to_string());
        };

        match handler.handle(payload, sender).await {
            Ok(data) => ActionResponse::ok(data),
            Err(e) => {
                warn!(action, error = %e, "handler failed");
                ActionResponse::err(e.to_string())
            }
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}
