//! Fenix SMS dispatch tool.
//!
//! One-shot command line entry point: reads provider credentials from the
//! environment, sends the given message through the resilient gateway and
//! exits non-zero when delivery fails.
//!
//! ```text
//! fenix "<message text>" <recipient> [recipient...]
//! ```

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use fenix_core::SmsProperties;
use fenix_sms::{AspsmsClient, AspsmsConfig, GatewayConfig, SmsGateway, SmsMessage};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    info!(
        user_key = %config.properties.user_key,
        originator = %config.properties.originator,
        endpoint = %config.endpoint,
        workers = config.workers,
        "Configuration loaded"
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((text, recipients)) = args.split_first() else {
        bail!("usage: fenix <message text> <recipient>...");
    };
    if recipients.is_empty() {
        bail!("usage: fenix <message text> <recipient>...");
    }

    let provider_config = AspsmsConfig {
        endpoint: config.endpoint.clone(),
        timeout: Duration::from_secs(config.timeout_seconds),
        ..AspsmsConfig::default()
    };
    let provider = Arc::new(AspsmsClient::new(provider_config)?);

    let gateway_config = GatewayConfig {
        worker_count: config.workers,
        ..GatewayConfig::default()
    };
    let gateway = SmsGateway::start(provider, gateway_config)?;

    let message = SmsMessage::new(text.clone(), recipients.iter().cloned(), config.properties);
    let ticket = gateway.send(message).context("message rejected")?;
    info!(
        message_id = %ticket.message_id(),
        recipient_count = recipients.len(),
        "Message submitted"
    );

    let report = ticket.report().await;
    let failure = report.error().map(ToString::to_string);
    match &failure {
        None => info!(
            message_id = %report.message_id,
            duration_ms = report.duration.as_millis(),
            "Message delivered"
        ),
        Some(reason) => warn!(message_id = %report.message_id, reason = %reason, "Message failed"),
    }

    gateway.shutdown().await?;

    if let Some(reason) = failure {
        bail!("delivery failed: {reason}");
    }
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,fenix=debug"))
        .expect("Invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Dispatch tool configuration.
struct Config {
    /// Provider account credentials and sender identity.
    properties: SmsProperties,
    /// Provider endpoint URL.
    endpoint: String,
    /// Provider call timeout in seconds.
    timeout_seconds: u64,
    /// Dispatch worker count.
    workers: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    fn from_env() -> Result<Self> {
        let user_key = std::env::var("ASPSMS_USER_KEY")
            .context("ASPSMS_USER_KEY environment variable not set")?;
        let password = std::env::var("ASPSMS_PASSWORD")
            .context("ASPSMS_PASSWORD environment variable not set")?;
        let originator = std::env::var("ASPSMS_ORIGINATOR")
            .context("ASPSMS_ORIGINATOR environment variable not set")?;

        let endpoint = std::env::var("ASPSMS_ENDPOINT")
            .unwrap_or_else(|_| AspsmsConfig::default().endpoint);

        let timeout_seconds = std::env::var("ASPSMS_TIMEOUT_SECONDS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(fenix_sms::DEFAULT_TIMEOUT_SECONDS);

        let workers = std::env::var("FENIX_SMS_WORKERS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(fenix_sms::DEFAULT_WORKER_COUNT);

        Ok(Self {
            properties: SmsProperties::new(user_key, password, originator),
            endpoint,
            timeout_seconds,
            workers,
        })
    }
}
