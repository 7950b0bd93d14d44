//! # crmlens Core
//!
//! The pieces every crmlens execution context shares: the correlation
//! registry pairing asynchronous requests with their replies, the message
//! router dispatching named actions in the background service, and the
//! poll-until-ready combinator used wherever a collaborator may not exist
//! yet.

pub mod correlation;
pub mod poll;
pub mod router;

pub use correlation::CorrelationRegistry;
pub use poll::{poll_until, PollConfig, PollError};
pub use router::{MessageRouter, RouterState};
