//! Tab lifecycle, badge, and notification collaborators.
//!
//! All three are browser-owned surfaces the background service drives
//! best-effort: a missing badge or notifier never fails an operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::TabHostError;

/// A browser tab as the tab host reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabInfo {
    pub id: i64,
    pub url: String,
}

/// Lifecycle events the tab host publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// The tab was destroyed. Any per-tab override must die with it.
    Closed { tab_id: i64 },
    /// The tab became the active tab in its window.
    Activated { tab_id: i64 },
    /// A top-level navigation in the tab committed.
    NavigationCompleted { tab_id: i64, url: String },
}

/// The browser's tab table.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// The currently focused tab, if any.
    async fn active_tab(&self) -> Result<Option<TabInfo>, TabHostError>;

    /// URL of a specific tab.
    async fn tab_url(&self, tab_id: i64) -> Result<Option<String>, TabHostError>;

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<TabEvent>;
}

/// Per-tab visible indicator (badge text on the extension icon).
#[async_trait]
pub trait BadgeIndicator: Send + Sync {
    async fn set_text(&self, tab_id: i64, text: &str) -> Result<(), TabHostError>;

    async fn clear(&self, tab_id: i64) -> Result<(), TabHostError>;
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// Transient, dismissible user-visible notification surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, level: NotifyLevel, message: &str);
}
