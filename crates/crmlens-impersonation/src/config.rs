//! Impersonation configuration.

use serde::{Deserialize, Serialize};

/// Parameters of the injected override rule.
///
/// The defaults match the CRM's Web API surface; embedders targeting a
/// different deployment shape override them at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpersonationConfig {
    /// Header carrying the impersonated user's directory object id.
    pub header_name: String,
    /// API path prefix the rule is scoped to, e.g. `/api/data/`.
    pub api_path_prefix: String,
    /// Priority assigned to every rule this service creates.
    pub rule_priority: i32,
    /// First rule id handed out after a reset. Ids only ever grow from
    /// here within one service lifetime.
    pub first_rule_id: i64,
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            header_name: "CallerObjectId".to_string(),
            api_path_prefix: "/api/data/".to_string(),
            rule_priority: 1,
            first_rule_id: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImpersonationConfig::default();
        assert_eq!(config.header_name, "CallerObjectId");
        assert_eq!(config.api_path_prefix, "/api/data/");
        assert_eq!(config.first_rule_id, 1);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ImpersonationConfig::default();
        let wire = serde_json::to_string(&config).unwrap();
        let back: ImpersonationConfig = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.header_name, config.header_name);
        assert_eq!(back.rule_priority, config.rule_priority);
    }
}
