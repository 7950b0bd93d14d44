use super::*;

fn config() -> ImpersonationConfig {
    ImpersonationConfig::default()
}

#[test]
fn test_build_rule_shape() {
    let rule = build_rule(4, 7, "org.crm.dynamics.com", "abc-123", &config());

    assert_eq!(rule.id, 4);
    assert_eq!(rule.condition.tab_ids, vec![7]);
    assert_eq!(rule.condition.url_filter, "||org.crm.dynamics.com/api/data/");
    assert_eq!(
        rule.condition.resource_types,
        vec![ResourceType::MainFrame, ResourceType::XmlHttpRequest]
    );
    assert_eq!(rule.action.request_headers.len(), 1);
    assert_eq!(rule.action.request_headers[0].header, "CallerObjectId");
    assert_eq!(rule.action.request_headers[0].value, "abc-123");
}

#[test]
fn test_round_trip_every_field() {
    // Reconstruction depends on parse inverting build exactly; assert every
    // field the creation path writes comes back out.
    let config = config();
    let rule = build_rule(12, 99, "org.crm.dynamics.com", "u-456", &config);

    let parsed = parse_rule(&rule, &config).unwrap();
    assert_eq!(
        parsed,
        ParsedRule {
            rule_id: 12,
            tab_id: 99,
            hostname: "org.crm.dynamics.com".to_string(),
            object_id: "u-456".to_string(),
        }
    );
}

#[test]
fn test_round_trip_with_custom_config() {
    let config = ImpersonationConfig {
        header_name: "X-Caller".to_string(),
        api_path_prefix: "/odata/v2/".to_string(),
        ..ImpersonationConfig::default()
    };
    let rule = build_rule(1, 3, "crm.example.org", "oid", &config);
    let parsed = parse_rule(&rule, &config).unwrap();
    assert_eq!(parsed.hostname, "crm.example.org");
    assert_eq!(parsed.object_id, "oid");
}

#[test]
fn test_parse_rejects_multi_tab_rule() {
    let mut rule = build_rule(1, 7, "h.example", "oid", &config());
    rule.condition.tab_ids = vec![7, 8];
    assert!(parse_rule(&rule, &config()).is_none());

    rule.condition.tab_ids = vec![];
    assert!(parse_rule(&rule, &config()).is_none());
}

#[test]
fn test_parse_rejects_unanchored_filter() {
    let mut rule = build_rule(1, 7, "h.example", "oid", &config());
    rule.condition.url_filter = "h.example/api/data/".to_string();
    assert!(parse_rule(&rule, &config()).is_none());
}

#[test]
fn test_parse_rejects_foreign_path_prefix() {
    let mut rule = build_rule(1, 7, "h.example", "oid", &config());
    rule.condition.url_filter = "||h.example/other/path/".to_string();
    assert!(parse_rule(&rule, &config()).is_none());
}

#[test]
fn test_parse_rejects_missing_header() {
    let mut rule = build_rule(1, 7, "h.example", "oid", &config());
    rule.action.request_headers[0].header = "X-Unrelated".to_string();
    assert!(parse_rule(&rule, &config()).is_none());
}

#[test]
fn test_parse_rejects_empty_object_id() {
    let mut rule = build_rule(1, 7, "h.example", "oid", &config());
    rule.action.request_headers[0].value = String::new();
    assert!(parse_rule(&rule, &config()).is_none());
}

#[test]
fn test_parse_header_name_case_insensitive() {
    let mut rule = build_rule(1, 7, "h.example", "oid", &config());
    rule.action.request_headers[0].header = "callerobjectid".to_string();
    let parsed = parse_rule(&rule, &config()).unwrap();
    assert_eq!(parsed.object_id, "oid");
}

#[test]
fn test_parse_scans_past_unrelated_headers() {
    let mut rule = build_rule(1, 7, "h.example", "oid", &config());
    rule.action.request_headers.insert(
        0,
        SetHeader {
            header: "X-Trace".to_string(),
            value: "t-1".to_string(),
        },
    );
    let parsed = parse_rule(&rule, &config()).unwrap();
    assert_eq!(parsed.object_id, "oid");
}
