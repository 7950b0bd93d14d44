//! # crmlens Background
//!
//! The long-lived background service: constructs the router and the
//! impersonation state machine, registers the `admin:*` surface, applies
//! the startup policy (wipe vs. reconstruct), and keeps per-tab overrides
//! pinned to their tab's lifetime.
//!
//! Also home to the in-memory collaborator adapters the dev harness and
//! integration tests run against.

pub mod memory;
pub mod service;

pub use memory::{InMemoryBadge, InMemoryRuleEngine, InMemoryTabHost, LogNotifier};
pub use service::{BackgroundService, StartupKind};
