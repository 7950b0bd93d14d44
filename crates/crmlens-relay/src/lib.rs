//! # crmlens Relay
//!
//! Runs inside the content script of the CRM document. The privileged
//! extension channel cannot reach the page's own script context, so the
//! relay bridges requests into the page as [`BridgeMessage`]s addressed to
//! the exact page origin, and matches replies back by request id.
//!
//! Also bridged the same way: the page-scoped session-key store and the
//! readiness probe for the host page's script global.
//!
//! [`BridgeMessage`]: crmlens_protocols::BridgeMessage

pub mod capability;
pub mod relay;
pub mod session;

pub use capability::{CapabilityProbe, HostCapability};
pub use relay::{ContextRelay, PageChannel};
pub use session::{SessionKeyCommand, SessionKeyStore};
