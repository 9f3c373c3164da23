//! Provider abstraction and the ASPSMS HTTP client.
//!
//! The gateway talks to providers through the [`SmsProvider`] trait. The
//! production implementation posts the simple-text form to ASPSMS and hands
//! back the raw status token; which token counts as success is the
//! gateway's decision.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use fenix_core::SmsProperties;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SmsError};

/// Outbound SMS provider.
#[async_trait]
pub trait SmsProvider: Send + Sync + fmt::Debug {
    /// Sends `text` to the semicolon-joined `recipients` using the given
    /// account credentials and returns the provider status token.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Transport` for connection-level failures and
    /// `SmsError::Timeout` when the call exceeds the configured timeout.
    async fn send_text(
        &self,
        text: &str,
        recipients: &str,
        properties: &SmsProperties,
    ) -> Result<String>;

    /// Provider name used for circuit breaker and log labels.
    fn name(&self) -> &str;
}

/// Configuration for the ASPSMS client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspsmsConfig {
    /// Endpoint URL of the simple-text send operation.
    pub endpoint: String,
    /// Timeout for the provider call.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for AspsmsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://soap.aspsms.com/aspsmsx2.asmx/SendSimpleTextSMS".to_string(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "Fenix-SMS/1.0".to_string(),
        }
    }
}

/// HTTP client for the ASPSMS simple-text interface.
///
/// Posts the send form and returns the trimmed response body, which carries
/// a status token such as `StatusCode:1`.
#[derive(Debug, Clone)]
pub struct AspsmsClient {
    client: reqwest::Client,
    config: AspsmsConfig,
}

impl AspsmsClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: AspsmsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SmsError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn with_defaults() -> Result<Self> {
        Self::new(AspsmsConfig::default())
    }
}

#[async_trait]
impl SmsProvider for AspsmsClient {
    async fn send_text(
        &self,
        text: &str,
        recipients: &str,
        properties: &SmsProperties,
    ) -> Result<String> {
        debug!(
            provider = self.name(),
            recipient_count = recipients.split(';').count(),
            "posting message to provider"
        );

        let form = [
            ("UserKey", properties.user_key.as_str()),
            ("Password", properties.password.as_str()),
            ("Recipients", recipients),
            ("Originator", properties.originator.as_str()),
            ("MessageText", text),
        ];

        let response = match self.client.post(&self.config.endpoint).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    return Err(SmsError::timeout(self.config.timeout.as_secs()));
                }
                if e.is_connect() {
                    return Err(SmsError::transport(format!("connection failed: {e}")));
                }
                return Err(SmsError::transport(e.to_string()));
            },
        };

        let status = response.status();
        if !status.is_success() {
            return Err(SmsError::transport(format!(
                "provider endpoint returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SmsError::transport(format!("failed to read provider response: {e}")))?;
        let token = body.trim().to_string();
        debug!(provider = self.name(), token = %token, "provider responded");

        Ok(token)
    }

    fn name(&self) -> &str {
        "aspsms"
    }
}

/// Scripted provider implementation for tests.
pub mod mock {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex, PoisonError,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use fenix_core::SmsProperties;

    use super::SmsProvider;
    use crate::error::Result;

    /// In-memory provider with scripted responses and a call counter.
    ///
    /// Scripted responses are consumed front to back; once they run out,
    /// every call answers with the default token.
    #[derive(Debug)]
    pub struct MockProvider {
        default_token: String,
        scripted: Mutex<VecDeque<Result<String>>>,
        delay: Mutex<Option<Duration>>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        /// Creates a provider that answers with the given token by default.
        pub fn new(default_token: impl Into<String>) -> Self {
            Self {
                default_token: default_token.into(),
                scripted: Mutex::new(VecDeque::new()),
                delay: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        /// Queues a response consumed by the next call.
        pub fn push_response(&self, response: Result<String>) {
            self.scripted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(response);
        }

        /// Delays every call by `delay` to simulate a slow provider.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
        }

        /// Number of calls the provider has received.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SmsProvider for MockProvider {
        async fn send_text(
            &self,
            _text: &str,
            _recipients: &str,
            _properties: &SmsProperties,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let scripted = self
                .scripted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match scripted {
                Some(response) => response,
                None => Ok(self.default_token.clone()),
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}
