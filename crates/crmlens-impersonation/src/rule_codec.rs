//! Pure codec between impersonation sessions and persisted rules.
//!
//! Reconstruction after a restart works by parsing the service's own rules
//! back out of the engine, which makes this the one place the rule wire
//! shape is written and read. Any change to [`build_rule`] that
//! [`parse_rule`] cannot invert breaks the round-trip tests here instead of
//! silently breaking reconstruction.

use std::sync::LazyLock;

use regex::Regex;

use crmlens_protocols::{HeaderRule, ResourceType, RuleAction, RuleCondition, SetHeader};

use crate::config::ImpersonationConfig;

#[cfg(test)]
#[path = "rule_codec_tests.rs"]
mod tests;

/// `||hostname/path`, the anchored filter shape [`build_rule`] writes.
static URL_FILTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|\|([^/|]+)(/.*)$").expect("static url filter pattern"));

/// The fields a persisted rule encodes about its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub rule_id: i64,
    pub tab_id: i64,
    pub hostname: String,
    pub object_id: String,
}

/// Build the single header-injection rule for one impersonation session.
///
/// Scoped to exactly one tab, the hostname's API path prefix, and
/// document + XHR traffic.
pub fn build_rule(
    rule_id: i64,
    tab_id: i64,
    hostname: &str,
    object_id: &str,
    config: &ImpersonationConfig,
) -> HeaderRule {
    HeaderRule {
        id: rule_id,
        priority: config.rule_priority,
        condition: RuleCondition {
            tab_ids: vec![tab_id],
            url_filter: format!("||{}{}", hostname, config.api_path_prefix),
            resource_types: vec![ResourceType::MainFrame, ResourceType::XmlHttpRequest],
        },
        action: RuleAction {
            request_headers: vec![SetHeader {
                header: config.header_name.clone(),
                value: object_id.to_string(),
            }],
        },
    }
}

/// Invert [`build_rule`]: recover the session fields from a persisted rule.
///
/// Returns `None` for any rule this service did not write: wrong tab
/// scoping, a filter that does not match the anchored shape or the
/// configured path prefix, or no occurrence of the configured header.
/// Callers skip such rules rather than aborting reconstruction.
pub fn parse_rule(rule: &HeaderRule, config: &ImpersonationConfig) -> Option<ParsedRule> {
    let [tab_id] = rule.condition.tab_ids[..] else {
        return None;
    };

    let captures = URL_FILTER_RE.captures(&rule.condition.url_filter)?;
    let hostname = captures.get(1)?.as_str();
    if captures.get(2)?.as_str() != config.api_path_prefix {
        return None;
    }

    let object_id = rule
        .action
        .request_headers
        .iter()
        .find(|h| h.header.eq_ignore_ascii_case(&config.header_name))
        .map(|h| h.value.clone())?;
    if object_id.is_empty() {
        return None;
    }

    Some(ParsedRule {
        rule_id: rule.id,
        tab_id,
        hostname: hostname.to_string(),
        object_id,
    })
}
