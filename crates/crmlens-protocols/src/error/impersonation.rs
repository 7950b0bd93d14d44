//! Impersonation state machine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImpersonationError {
    /// Impersonation requested against a tab whose URL is not a secure,
    /// parseable web address (browser-internal pages, plain http).
    #[error("Invalid impersonation target: {0}")]
    InvalidTarget(String),

    /// The selected user carries no directory object id.
    #[error("Impersonated user has no object id")]
    MissingObjectId,

    /// No tab id in the payload and no active tab to fall back to.
    #[error("No active tab to impersonate in")]
    NoActiveTab,

    /// Rule engine failure. Fatal on start (the override would silently not
    /// apply); logged and tolerated on stop.
    #[error("Rule engine error: {0}")]
    RuleEngine(#[from] super::RuleEngineError),
}
