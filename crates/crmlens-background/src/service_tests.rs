use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crmlens_protocols::SenderContext;

use crate::memory::{InMemoryBadge, InMemoryRuleEngine, InMemoryTabHost, LogNotifier};

use super::*;

const CRM_URL: &str = "https://org.crm.dynamics.com/main.aspx";

struct Harness {
    service: BackgroundService,
    engine: Arc<InMemoryRuleEngine>,
    tabs: Arc<InMemoryTabHost>,
    badge: Arc<InMemoryBadge>,
}

fn harness() -> Harness {
    let engine = Arc::new(InMemoryRuleEngine::new());
    let tabs = Arc::new(InMemoryTabHost::new());
    let badge = Arc::new(InMemoryBadge::new());
    let service = BackgroundService::new(
        ImpersonationConfig::default(),
        engine.clone(),
        tabs.clone(),
        badge.clone(),
        Arc::new(LogNotifier),
    );
    Harness {
        service,
        engine,
        tabs,
        badge,
    }
}

fn start_payload(tab_id: i64) -> Value {
    json!({
        "user": {"objectId": "abc-123", "displayName": "Jane Doe"},
        "tabId": tab_id,
        "tabUrl": CRM_URL,
    })
}

async fn start_impersonation(h: &Harness, tab_id: i64) {
    let resp = h
        .service
        .router()
        .dispatch(
            "admin:start-impersonation",
            start_payload(tab_id),
            SenderContext::default(),
        )
        .await;
    assert!(resp.success, "{:?}", resp.error);
}

#[tokio::test]
async fn test_full_session_over_the_wire() {
    let h = harness();
    h.service.start(StartupKind::FreshInstall).await.unwrap();

    start_impersonation(&h, 7).await;
    assert_eq!(h.engine.len(), 1);
    assert_eq!(h.badge.text_for(7).as_deref(), Some("JD"));

    let resp = h
        .service
        .router()
        .dispatch(
            "admin:get-impersonation-status",
            json!({"tabId": 7}),
            SenderContext::default(),
        )
        .await;
    assert_eq!(resp.data.unwrap()["objectId"], "abc-123");

    let resp = h
        .service
        .router()
        .dispatch(
            "admin:stop-impersonation",
            json!({"tabId": 7}),
            SenderContext::default(),
        )
        .await;
    assert!(resp.success);
    assert!(h.engine.is_empty());
    assert!(h.badge.text_for(7).is_none());
}

#[tokio::test]
async fn test_dispatch_before_start_queues_until_ready() {
    // Testable property 7, through the whole service: the popup asks for
    // status before the worker has wired anything up.
    let h = harness();
    let router = h.service.router().clone();

    let early = tokio::spawn(async move {
        router
            .dispatch(
                "admin:get-impersonation-status",
                json!({"tabId": 7}),
                SenderContext::default(),
            )
            .await
    });
    tokio::task::yield_now().await;

    h.service.start(StartupKind::FreshInstall).await.unwrap();

    let resp = early.await.unwrap();
    assert!(resp.success, "{:?}", resp.error);
    assert_eq!(resp.data, Some(Value::Null));
}

#[tokio::test]
async fn test_tab_close_event_reaps_override() {
    let h = harness();
    h.service.start(StartupKind::FreshInstall).await.unwrap();
    h.tabs.open_tab(7, CRM_URL);
    start_impersonation(&h, 7).await;

    h.tabs.close_tab(7);

    // The listener runs on its own task; give it a moment.
    for _ in 0..50 {
        if h.service.manager().status(7).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(h.service.manager().status(7).is_none());
    assert!(h.engine.is_empty());
    assert!(h.badge.text_for(7).is_none());
}

#[tokio::test]
async fn test_fresh_install_wipes_foreign_leftovers() {
    let h = harness();
    // A rule left behind by a crashed previous process.
    h.engine
        .add_rule(crmlens_impersonation::build_rule(
            40,
            3,
            "org.crm.dynamics.com",
            "stale-user",
            &ImpersonationConfig::default(),
        ))
        .await
        .unwrap();

    h.service.start(StartupKind::BrowserStart).await.unwrap();

    assert!(h.engine.is_empty());
    assert_eq!(h.service.manager().active_len(), 0);
}

#[tokio::test]
async fn test_service_restart_reconstructs_sessions() {
    let h = harness();
    h.service.start(StartupKind::FreshInstall).await.unwrap();
    start_impersonation(&h, 7).await;
    start_impersonation(&h, 9).await;
    h.service.shutdown();

    // Same engine, new service: the mid-session relaunch path.
    let relaunched = BackgroundService::new(
        ImpersonationConfig::default(),
        h.engine.clone(),
        h.tabs.clone(),
        h.badge.clone(),
        Arc::new(LogNotifier),
    );
    relaunched.start(StartupKind::ServiceRestart).await.unwrap();

    assert_eq!(relaunched.manager().active_len(), 2);
    let restored = relaunched.manager().status(7).unwrap();
    assert_eq!(restored.object_id, "abc-123");
    assert_eq!(restored.display_name, "(restored)");

    // New sessions must not collide with surviving rule ids.
    let resp = relaunched
        .router()
        .dispatch(
            "admin:start-impersonation",
            start_payload(11),
            SenderContext::default(),
        )
        .await;
    assert!(resp.success, "{:?}", resp.error);
    let ids: Vec<i64> = h.engine.snapshot().iter().map(|r| r.id).collect();
    let unique: std::collections::HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
}

#[tokio::test]
async fn test_force_cleanup_over_the_wire() {
    let h = harness();
    h.service.start(StartupKind::FreshInstall).await.unwrap();
    start_impersonation(&h, 1).await;
    start_impersonation(&h, 2).await;

    let resp = h
        .service
        .router()
        .dispatch(
            "admin:force-cleanup-impersonation",
            json!({}),
            SenderContext::default(),
        )
        .await;
    assert!(resp.success);
    assert_eq!(h.service.manager().active_len(), 0);
    assert!(h.engine.is_empty());
}

#[tokio::test]
async fn test_unknown_action_still_fails_cleanly() {
    let h = harness();
    h.service.start(StartupKind::FreshInstall).await.unwrap();

    let resp = h
        .service
        .router()
        .dispatch("admin:read-mind", json!({}), SenderContext::default())
        .await;
    assert!(!resp.success);
    assert!(resp.error.unwrap().contains("admin:read-mind"));
}
