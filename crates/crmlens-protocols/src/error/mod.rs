//! Error types for the crmlens protocol layer.

mod action;
mod impersonation;
mod relay;
mod router;
mod rules;
mod tabs;

pub use action::*;
pub use impersonation::*;
pub use relay::*;
pub use router::*;
pub use rules::*;
pub use tabs::*;
