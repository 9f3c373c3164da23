//! Resilient SMS dispatch for fenix alert notifications.
//!
//! Messages are queued onto a bounded pool of dispatch workers, posted to
//! the SMS provider over HTTP, and guarded by a per-provider circuit
//! breaker so a vendor outage degrades into fast local rejections instead
//! of a pile-up of waiting callers.
//!
//! # Architecture
//!
//! 1. **Validation**: empty text or recipients are rejected synchronously,
//!    before any queueing or provider traffic
//! 2. **Bulkhead**: a bounded queue feeds a fixed number of workers; a full
//!    queue rejects the call instead of blocking it
//! 3. **Circuit breaker**: repeated provider failures trip the circuit and
//!    further dispatches fail fast until a cooldown trial succeeds
//! 4. **Reporting**: every accepted request resolves exactly once with a
//!    delivery report
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fenix_core::SmsProperties;
//! use fenix_sms::{AspsmsClient, GatewayConfig, SmsGateway, SmsMessage};
//!
//! # async fn example() -> Result<(), fenix_sms::SmsError> {
//! let provider = Arc::new(AspsmsClient::with_defaults()?);
//! let gateway = SmsGateway::start(provider, GatewayConfig::default())?;
//!
//! let message = SmsMessage::new(
//!     "Exercise tonight at 18:00",
//!     ["+358401234567"],
//!     SmsProperties::new("user-key", "password", "FENIX"),
//! );
//! let report = gateway.send(message)?.report().await;
//! assert!(report.is_delivered());
//! # Ok(())
//! # }
//! ```

pub mod circuit;
pub mod error;
pub mod gateway;
pub mod message;
pub mod provider;

pub use circuit::{CircuitBreaker, CircuitConfig, CircuitSnapshot, CircuitState};
pub use error::{ErrorCategory, Result, SmsError};
pub use gateway::{GatewayConfig, GatewayStats, SmsGateway, SmsTicket};
pub use message::{SmsMessage, SmsOutcome, SmsReport};
pub use provider::{AspsmsClient, AspsmsConfig, SmsProvider};

/// Default number of concurrent dispatch workers per provider.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Default capacity of the dispatch queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Default provider call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Status token the provider returns for an accepted message.
pub const DEFAULT_SUCCESS_STATUS: &str = "StatusCode:1";
