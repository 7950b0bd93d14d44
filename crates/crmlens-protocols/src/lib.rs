//! # crmlens Protocols
//!
//! Wire shapes and collaborator traits shared by every crmlens execution
//! context (popup UI, content relay, background service).
//!
//! ## Core Concepts
//!
//! - **ActionRequest / ActionResponse**: the envelope every UI-originated
//!   request travels in, and the normalized reply shape that never throws
//!   across a context boundary
//! - **BridgeMessage**: the closed tagged union exchanged with the host
//!   page's own script context
//! - **Collaborator traits**: seams for the browser-owned facilities the
//!   core drives but never owns (rule engine, tab host, badge, page channel)

pub mod error;
pub mod handler;
pub mod message;
pub mod rules;
pub mod tabs;
pub mod user;

pub use handler::{ActionHandler, FnHandler, SenderContext};
pub use message::{ActionRequest, ActionResponse, BridgeMessage};
pub use rules::{HeaderRule, ResourceType, RuleAction, RuleCondition, RuleEngine, SetHeader};
pub use tabs::{BadgeIndicator, Notifier, NotifyLevel, TabEvent, TabHost, TabInfo};
pub use user::ImpersonatedUser;
