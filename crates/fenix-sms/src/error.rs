//! Error types for notification dispatch.
//!
//! Validation and configuration problems surface synchronously from the
//! gateway API; circuit and provider failures travel through the
//! asynchronous delivery report. The gateway itself never retries.

use std::fmt;

use thiserror::Error;

/// Result type alias for notification operations.
pub type Result<T> = std::result::Result<T, SmsError>;

/// Error conditions for notification dispatch.
#[derive(Debug, Clone, Error)]
pub enum SmsError {
    /// Message text was empty.
    #[error("message text is empty")]
    EmptyMessage,

    /// Recipient list was empty after discarding blank entries.
    #[error("recipient list is empty")]
    NoRecipients,

    /// Circuit breaker is open; the call failed fast without a provider
    /// attempt.
    #[error("circuit breaker open for provider {provider}")]
    CircuitOpen {
        /// Name of the provider with the open circuit
        provider: String,
    },

    /// Provider answered with a non-success status token.
    #[error("provider rejected message: {status}")]
    ProviderRejected {
        /// Raw status token returned by the provider
        status: String,
    },

    /// Transport-level failure reaching the provider.
    #[error("provider transport failed: {message}")]
    Transport {
        /// Transport error message
        message: String,
    },

    /// Provider call exceeded its timeout.
    #[error("provider call timed out after {timeout_seconds}s")]
    Timeout {
        /// Seconds waited before the call timed out
        timeout_seconds: u64,
    },

    /// Invalid gateway or provider configuration.
    #[error("invalid gateway configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// Dispatch queue is at capacity; the request was rejected.
    #[error("dispatch queue full: {capacity} requests pending")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// Gateway has shut down and accepts no further requests.
    #[error("gateway is shut down")]
    GatewayClosed,

    /// Graceful shutdown exceeded its timeout.
    #[error("gateway shutdown timed out after {timeout_seconds}s")]
    ShutdownTimeout {
        /// Seconds waited before giving up
        timeout_seconds: u64,
    },
}

impl SmsError {
    /// Creates a circuit open error for the named provider.
    pub fn circuit_open(provider: impl Into<String>) -> Self {
        Self::CircuitOpen { provider: provider.into() }
    }

    /// Creates a provider rejection carrying the raw status token.
    pub fn provider_rejected(status: impl Into<String>) -> Self {
        Self::ProviderRejected { status: status.into() }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a queue full error.
    pub fn queue_full(capacity: usize) -> Self {
        Self::QueueFull { capacity }
    }

    /// Creates a shutdown timeout error.
    pub fn shutdown_timeout(timeout_seconds: u64) -> Self {
        Self::ShutdownTimeout { timeout_seconds }
    }

    /// Returns `true` for request validation failures.
    ///
    /// These are rejected before the request reaches the dispatch queue.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyMessage | Self::NoRecipients)
    }

    /// Returns `true` for failures attributable to the provider call.
    ///
    /// These are the outcomes that count against the circuit breaker:
    /// non-success status tokens, transport failures and timeouts.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderRejected { .. } | Self::Transport { .. } | Self::Timeout { .. }
        )
    }
}

/// Category of a notification error, used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request rejected before dispatch.
    Validation,
    /// Circuit breaker fail-fast.
    Circuit,
    /// Provider call failed.
    Provider,
    /// Invalid configuration.
    Configuration,
    /// Bulkhead capacity exhausted.
    Capacity,
    /// Gateway lifecycle.
    Shutdown,
}

impl From<&SmsError> for ErrorCategory {
    fn from(error: &SmsError) -> Self {
        match error {
            SmsError::EmptyMessage | SmsError::NoRecipients => Self::Validation,
            SmsError::CircuitOpen { .. } => Self::Circuit,
            SmsError::ProviderRejected { .. }
            | SmsError::Transport { .. }
            | SmsError::Timeout { .. } => Self::Provider,
            SmsError::Configuration { .. } => Self::Configuration,
            SmsError::QueueFull { .. } => Self::Capacity,
            SmsError::GatewayClosed | SmsError::ShutdownTimeout { .. } => Self::Shutdown,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Circuit => "circuit",
            Self::Provider => "provider",
            Self::Configuration => "configuration",
            Self::Capacity => "capacity",
            Self::Shutdown => "shutdown",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        let error = SmsError::circuit_open("aspsms");
        assert_eq!(error.to_string(), "circuit breaker open for provider aspsms");

        let error = SmsError::provider_rejected("StatusCode:2");
        assert_eq!(error.to_string(), "provider rejected message: StatusCode:2");

        let error = SmsError::timeout(30);
        assert_eq!(error.to_string(), "provider call timed out after 30s");

        let error = SmsError::queue_full(32);
        assert_eq!(error.to_string(), "dispatch queue full: 32 requests pending");
    }

    #[test]
    fn validation_errors_identified_correctly() {
        assert!(SmsError::EmptyMessage.is_validation());
        assert!(SmsError::NoRecipients.is_validation());
        assert!(!SmsError::circuit_open("aspsms").is_validation());
        assert!(!SmsError::queue_full(8).is_validation());
    }

    #[test]
    fn provider_failures_identified_correctly() {
        assert!(SmsError::provider_rejected("StatusCode:2").is_provider_failure());
        assert!(SmsError::transport("connection refused").is_provider_failure());
        assert!(SmsError::timeout(5).is_provider_failure());

        assert!(!SmsError::circuit_open("aspsms").is_provider_failure());
        assert!(!SmsError::EmptyMessage.is_provider_failure());
        assert!(!SmsError::GatewayClosed.is_provider_failure());
    }

    #[test]
    fn errors_map_to_expected_categories() {
        assert_eq!(ErrorCategory::from(&SmsError::NoRecipients), ErrorCategory::Validation);
        assert_eq!(ErrorCategory::from(&SmsError::circuit_open("aspsms")), ErrorCategory::Circuit);
        assert_eq!(
            ErrorCategory::from(&SmsError::provider_rejected("StatusCode:2")),
            ErrorCategory::Provider
        );
        assert_eq!(ErrorCategory::from(&SmsError::queue_full(8)), ErrorCategory::Capacity);
        assert_eq!(ErrorCategory::from(&SmsError::GatewayClosed), ErrorCategory::Shutdown);
        assert_eq!(ErrorCategory::Provider.to_string(), "provider");
    }
}
