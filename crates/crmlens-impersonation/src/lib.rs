//! # crmlens Impersonation
//!
//! The tab-scoped impersonation state machine: at most one active override
//! per browser tab, durable across background restarts via the declarative
//! rule engine, with a per-tab badge reflecting who the tab is running as.
//!
//! The in-memory map is the authority while the service lives; the rule
//! table is its durable projection. After a mid-session restart the map is
//! rebuilt from persisted rules; after an install or browser start the
//! slate is wiped instead.

pub mod config;
pub mod handlers;
pub mod manager;
pub mod rule_codec;

pub use config::ImpersonationConfig;
pub use handlers::register_handlers;
pub use manager::{ImpersonationManager, TabImpersonation};
pub use rule_codec::{build_rule, parse_rule, ParsedRule};
