//! The user identity an impersonation session runs as.

use serde::{Deserialize, Serialize};

/// A CRM user selected for impersonation.
///
/// `object_id` is the directory object id injected into outgoing requests;
/// it is the only field the rule engine ever sees. The rest are display
/// metadata for the UI and badge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImpersonatedUser {
    /// Directory object id. Required, non-empty.
    #[serde(rename = "objectId")]
    pub object_id: String,
    /// Full display name, e.g. "Jane Doe".
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    /// Primary email, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ImpersonatedUser {
    pub fn new(object_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            display_name: display_name.into(),
            email: None,
        }
    }

    /// Placeholder identity rebuilt from a persisted rule, where only the
    /// object id survives.
    pub fn reconstructed(object_id: impl Into<String>) -> Self {
        Self::new(object_id, "(restored)")
    }

    /// Badge initials: first letter of the first and last whitespace
    /// segments, uppercased. Single-segment names use the first two
    /// characters.
    pub fn initials(&self) -> String {
        let segments: Vec<&str> = self.display_name.split_whitespace().collect();
        match segments.as_slice() {
            [] => String::new(),
            [only] => only.chars().take(2).collect::<String>().to_uppercase(),
            [first, .., last] => {
                let mut out = String::new();
                out.extend(first.chars().next());
                out.extend(last.chars().next());
                out.to_uppercase()
            }
        }
    }
}
