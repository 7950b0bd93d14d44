//! Background service lifecycle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crmlens_core::MessageRouter;
use crmlens_impersonation::{register_handlers, ImpersonationConfig, ImpersonationManager};
use crmlens_protocols::error::ImpersonationError;
use crmlens_protocols::{BadgeIndicator, Notifier, RuleEngine, TabEvent, TabHost};

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

/// Why the background process is coming up.
///
/// Install and browser start do not trust surviving rules and wipe the
/// slate; a mid-session service relaunch reconstructs from them instead.
/// The embedder decides which lifecycle event it observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupKind {
    /// Extension installed or updated.
    FreshInstall,
    /// Browser started; no session can have survived.
    BrowserStart,
    /// The service process alone was relaunched mid-session.
    ServiceRestart,
}

/// The background process entry state: owns every long-lived component and
/// hands them to handlers by reference. No ambient globals.
pub struct BackgroundService {
    router: Arc<MessageRouter>,
    manager: Arc<ImpersonationManager>,
    tabs: Arc<dyn TabHost>,
    notifier: Arc<dyn Notifier>,
    tab_listener: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundService {
    pub fn new(
        config: ImpersonationConfig,
        rules: Arc<dyn RuleEngine>,
        tabs: Arc<dyn TabHost>,
        badge: Arc<dyn BadgeIndicator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let manager = Arc::new(ImpersonationManager::new(config, rules, badge));
        Self {
            router: Arc::new(MessageRouter::new()),
            manager,
            tabs,
            notifier,
            tab_listener: parking_lot::Mutex::new(None),
        }
    }

    /// Bring the service up.
    ///
    /// Requests dispatched before this completes are queued by the router
    /// and served, in arrival order, once registration finishes.
    pub async fn start(&self, kind: StartupKind) -> Result<(), ImpersonationError> {
        info!(?kind, "background service starting");
        self.router.begin_registration();
        register_handlers(
            &self.router,
            self.manager.clone(),
            self.tabs.clone(),
            self.notifier.clone(),
        );

        match kind {
            StartupKind::FreshInstall | StartupKind::BrowserStart => {
                self.manager.initialize_on_startup().await?;
            }
            StartupKind::ServiceRestart => {
                let rebuilt = self.manager.reconstruct_from_existing_rules().await?;
                if rebuilt > 0 {
                    info!(rebuilt, "restored impersonation sessions after restart");
                }
            }
        }

        self.spawn_tab_listener();
        self.router.mark_ready().await;
        info!("background service ready");
        Ok(())
    }

    /// The router, for the transport layer to dispatch into.
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// The state machine, for diagnostics.
    pub fn manager(&self) -> &Arc<ImpersonationManager> {
        &self.manager
    }

    /// Stop listening for tab events. Pending router queue entries are
    /// unaffected.
    pub fn shutdown(&self) {
        if let Some(handle) = self.tab_listener.lock().take() {
            handle.abort();
        }
        info!("background service shut down");
    }

    fn spawn_tab_listener(&self) {
        let mut events = self.tabs.subscribe();
        let manager = self.manager.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(TabEvent::Closed { tab_id }) => {
                        debug!(tab_id, "tab closed");
                        manager.handle_tab_closed(tab_id).await;
                    }
                    // Activation and navigation matter to the UI layer,
                    // not to override lifetime.
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "tab event stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.tab_listener.lock() = Some(handle);
    }
}

impl Drop for BackgroundService {
    fn drop(&mut self) {
        if let Some(handle) = self.tab_listener.lock().take() {
            handle.abort();
        }
    }
}
