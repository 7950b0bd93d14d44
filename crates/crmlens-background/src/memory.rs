//! In-memory collaborator adapters.
//!
//! Stand-ins for the browser-owned facilities, used by the dev harness
//! binary and by integration tests. They implement the collaborator traits
//! faithfully enough to exercise every state transition: the rule engine
//! persists across service instances, the tab host publishes lifecycle
//! events, the badge records its text per tab.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::info;

use crmlens_protocols::error::{RuleEngineError, TabHostError};
use crmlens_protocols::{
    BadgeIndicator, HeaderRule, Notifier, NotifyLevel, RuleEngine, TabEvent, TabHost, TabInfo,
};

/// Rule table living for the lifetime of the harness, like the browser's
/// own table outlives the service worker.
#[derive(Default)]
pub struct InMemoryRuleEngine {
    rules: Mutex<Vec<HeaderRule>>,
}

impl InMemoryRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<HeaderRule> {
        self.rules.lock().clone()
    }
}

#[async_trait]
impl RuleEngine for InMemoryRuleEngine {
    async fn add_rule(&self, rule: HeaderRule) -> Result<(), RuleEngineError> {
        let mut rules = self.rules.lock();
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(RuleEngineError::AddFailed(format!(
                "duplicate rule id {}",
                rule.id
            )));
        }
        rules.push(rule);
        Ok(())
    }

    async fn remove_rules(&self, ids: &[i64]) -> Result<(), RuleEngineError> {
        self.rules.lock().retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<HeaderRule>, RuleEngineError> {
        Ok(self.rules.lock().clone())
    }
}

/// Scriptable tab table: the harness opens, navigates, and closes tabs.
pub struct InMemoryTabHost {
    tabs: RwLock<HashMap<i64, TabInfo>>,
    active: RwLock<Option<i64>>,
    events: broadcast::Sender<TabEvent>,
}

impl InMemoryTabHost {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            tabs: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
            events,
        }
    }

    /// Open a tab and make it active.
    pub fn open_tab(&self, tab_id: i64, url: impl Into<String>) {
        self.tabs.write().insert(
            tab_id,
            TabInfo {
                id: tab_id,
                url: url.into(),
            },
        );
        *self.active.write() = Some(tab_id);
        let _ = self.events.send(TabEvent::Activated { tab_id });
    }

    /// Navigate a tab, publishing the completed navigation.
    pub fn navigate(&self, tab_id: i64, url: impl Into<String>) {
        let url = url.into();
        if let Some(tab) = self.tabs.write().get_mut(&tab_id) {
            tab.url = url.clone();
        }
        let _ = self.events.send(TabEvent::NavigationCompleted { tab_id, url });
    }

    /// Close a tab, publishing the closure.
    pub fn close_tab(&self, tab_id: i64) {
        self.tabs.write().remove(&tab_id);
        let mut active = self.active.write();
        if *active == Some(tab_id) {
            *active = None;
        }
        let _ = self.events.send(TabEvent::Closed { tab_id });
    }
}

impl Default for InMemoryTabHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabHost for InMemoryTabHost {
    async fn active_tab(&self) -> Result<Option<TabInfo>, TabHostError> {
        let active = *self.active.read();
        Ok(active.and_then(|id| self.tabs.read().get(&id).cloned()))
    }

    async fn tab_url(&self, tab_id: i64) -> Result<Option<String>, TabHostError> {
        Ok(self.tabs.read().get(&tab_id).map(|t| t.url.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }
}

/// Badge recording its text per tab.
#[derive(Default)]
pub struct InMemoryBadge {
    text: Mutex<HashMap<i64, String>>,
}

impl InMemoryBadge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_for(&self, tab_id: i64) -> Option<String> {
        self.text.lock().get(&tab_id).cloned()
    }
}

#[async_trait]
impl BadgeIndicator for InMemoryBadge {
    async fn set_text(&self, tab_id: i64, text: &str) -> Result<(), TabHostError> {
        self.text.lock().insert(tab_id, text.to_string());
        Ok(())
    }

    async fn clear(&self, tab_id: i64) -> Result<(), TabHostError> {
        self.text.lock().remove(&tab_id);
        Ok(())
    }
}

/// Notifier that forwards to the log; good enough for a harness where the
/// "user" is reading stdout.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, level: NotifyLevel, message: &str) {
        info!(?level, message, "user notification");
    }
}
