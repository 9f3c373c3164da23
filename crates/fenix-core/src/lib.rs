//! Shared domain primitives for the fenix services.
//!
//! Provides the strongly-typed identifiers, provider credential set, and
//! clock abstraction that the entity identity and notification crates build
//! on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod models;
pub mod time;

pub use models::{EntityId, LockVersion, MessageId, SmsProperties};
pub use time::{Clock, RealClock, TestClock};
