//! The `admin:*` action surface.
//!
//! Thin glue between the router's untyped payloads and the typed state
//! machine. Payload tab ids are optional; a missing one falls back to the
//! sender's tab, then to the tab host's active tab.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crmlens_core::MessageRouter;
use crmlens_protocols::error::{ActionError, ImpersonationError};
use crmlens_protocols::{
    FnHandler, ImpersonatedUser, Notifier, NotifyLevel, SenderContext, TabHost,
};

use crate::manager::ImpersonationManager;

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

pub const START: &str = "admin:start-impersonation";
pub const STOP: &str = "admin:stop-impersonation";
pub const STATUS: &str = "admin:get-impersonation-status";
pub const FORCE_CLEANUP: &str = "admin:force-cleanup-impersonation";

#[derive(Debug, Deserialize)]
struct StartPayload {
    user: ImpersonatedUser,
    #[serde(rename = "tabId", default)]
    tab_id: Option<i64>,
    #[serde(rename = "tabUrl", default)]
    tab_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TabPayload {
    #[serde(rename = "tabId", default)]
    tab_id: Option<i64>,
}

/// Everything the handlers close over.
#[derive(Clone)]
struct HandlerDeps {
    manager: Arc<ImpersonationManager>,
    tabs: Arc<dyn TabHost>,
    notifier: Arc<dyn Notifier>,
}

impl HandlerDeps {
    /// Payload tab id, else sender tab, else the active tab.
    async fn resolve_tab(
        &self,
        explicit: Option<i64>,
        sender: &SenderContext,
    ) -> Result<i64, ImpersonationError> {
        if let Some(tab_id) = explicit.or(sender.tab_id) {
            return Ok(tab_id);
        }
        match self.tabs.active_tab().await {
            Ok(Some(tab)) => Ok(tab.id),
            _ => Err(ImpersonationError::NoActiveTab),
        }
    }

    async fn surface(&self, err: &ImpersonationError) {
        self.notifier
            .notify(NotifyLevel::Error, &err.to_string())
            .await;
    }
}

/// Register all four `admin:*` handlers on `router`.
pub fn register_handlers(
    router: &MessageRouter,
    manager: Arc<ImpersonationManager>,
    tabs: Arc<dyn TabHost>,
    notifier: Arc<dyn Notifier>,
) {
    let deps = HandlerDeps {
        manager,
        tabs,
        notifier,
    };

    {
        let deps = deps.clone();
        router.register_handler(
            START,
            Arc::new(FnHandler(move |payload: Value, sender: SenderContext| {
                let deps = deps.clone();
                async move { start(deps, payload, sender).await }
            })),
        );
    }
    {
        let deps = deps.clone();
        router.register_handler(
            STOP,
            Arc::new(FnHandler(move |payload: Value, sender: SenderContext| {
                let deps = deps.clone();
                async move { stop(deps, payload, sender).await }
            })),
        );
    }
    {
        let deps = deps.clone();
        router.register_handler(
            STATUS,
            Arc::new(FnHandler(move |payload: Value, sender: SenderContext| {
                let deps = deps.clone();
                async move { status(deps, payload, sender).await }
            })),
        );
    }
    router.register_handler(
        FORCE_CLEANUP,
        Arc::new(FnHandler(move |_: Value, _: SenderContext| {
            let deps = deps.clone();
            async move { force_cleanup(deps).await }
        })),
    );
}

async fn start(
    deps: HandlerDeps,
    payload: Value,
    sender: SenderContext,
) -> Result<Value, ActionError> {
    let payload: StartPayload = serde_json::from_value(payload)?;
    let result = async {
        let tab_id = deps.resolve_tab(payload.tab_id, &sender).await?;
        let tab_url = match payload.tab_url {
            Some(url) => url,
            None => deps
                .tabs
                .tab_url(tab_id)
                .await
                .ok()
                .flatten()
                .ok_or(ImpersonationError::NoActiveTab)?,
        };
        deps.manager
            .start_impersonation(tab_id, &tab_url, payload.user)
            .await
    }
    .await;

    if let Err(e) = &result {
        error!(error = %e, "start-impersonation failed");
        deps.surface(e).await;
    }
    result?;
    Ok(json!({}))
}

async fn stop(
    deps: HandlerDeps,
    payload: Value,
    sender: SenderContext,
) -> Result<Value, ActionError> {
    let payload: TabPayload = parse_tab_payload(payload)?;
    let tab_id = match deps.resolve_tab(payload.tab_id, &sender).await {
        Ok(tab_id) => tab_id,
        Err(e) => {
            deps.surface(&e).await;
            return Err(e.into());
        }
    };
    deps.manager.stop_impersonation(tab_id).await;
    Ok(json!({}))
}

async fn status(
    deps: HandlerDeps,
    payload: Value,
    sender: SenderContext,
) -> Result<Value, ActionError> {
    let payload: TabPayload = parse_tab_payload(payload)?;
    let tab_id = deps.resolve_tab(payload.tab_id, &sender).await?;
    match deps.manager.status(tab_id) {
        Some(user) => Ok(serde_json::to_value(user)?),
        None => Ok(Value::Null),
    }
}

async fn force_cleanup(deps: HandlerDeps) -> Result<Value, ActionError> {
    if let Err(e) = deps.manager.force_cleanup().await {
        error!(error = %e, "force cleanup failed");
        deps.surface(&e).await;
        return Err(e.into());
    }
    Ok(json!({}))
}

/// Status and stop accept a missing or null payload as "the sender's tab".
fn parse_tab_payload(payload: Value) -> Result<TabPayload, ActionError> {
    if payload.is_null() {
        return Ok(TabPayload::default());
    }
    Ok(serde_json::from_value(payload)?)
}
