//! Declarative request-modification rules and the engine that applies them.
//!
//! The rule engine is browser-owned: it rewrites matching network requests
//! without the service ever observing the traffic. The service only adds,
//! removes, and lists rules it created itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RuleEngineError;

/// Resource classes a rule condition can match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Top-level document navigations.
    MainFrame,
    /// XHR / fetch traffic.
    XmlHttpRequest,
}

/// Scoping condition: which requests a rule applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCondition {
    /// Tabs the rule is restricted to. Always exactly one for
    /// impersonation rules.
    #[serde(rename = "tabIds")]
    pub tab_ids: Vec<i64>,
    /// URL filter expression, e.g. `||org.crm.dynamics.com/api/data/`.
    #[serde(rename = "urlFilter")]
    pub url_filter: String,
    /// Resource-type whitelist.
    #[serde(rename = "resourceTypes")]
    pub resource_types: Vec<ResourceType>,
}

/// A single header set by a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetHeader {
    pub header: String,
    pub value: String,
}

/// Effect of a rule: headers written onto matching requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleAction {
    #[serde(rename = "requestHeaders")]
    pub request_headers: Vec<SetHeader>,
}

/// A complete header-injection rule as the engine stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeaderRule {
    pub id: i64,
    pub priority: i32,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

/// The browser's declarative request-modification facility.
///
/// Shared resource: other parties may mutate the rule table, but rules this
/// service created (identified by the ids it tracks) are only ever touched
/// by the service itself.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Persist a rule. The id must not collide with a live rule.
    async fn add_rule(&self, rule: HeaderRule) -> Result<(), RuleEngineError>;

    /// Remove rules by id. Ids that no longer exist are not an error.
    async fn remove_rules(&self, ids: &[i64]) -> Result<(), RuleEngineError>;

    /// List every rule currently persisted for this extension.
    async fn list_rules(&self) -> Result<Vec<HeaderRule>, RuleEngineError>;
}
