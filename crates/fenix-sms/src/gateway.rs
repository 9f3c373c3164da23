//! Resilient dispatch gateway with a per-provider bulkhead.
//!
//! [`SmsGateway::send`] validates synchronously, assigns a correlation id
//! and enqueues the request on a bounded queue consumed by a fixed pool of
//! dispatch workers. The returned [`SmsTicket`] resolves exactly once with
//! the delivery report. A circuit breaker shared by all workers turns a
//! provider outage into fast local rejections.
//!
//! # Dispatch pipeline
//!
//! 1. **Validate**: empty text or recipients rejected before queueing
//! 2. **Enqueue**: bounded queue; a full queue rejects the call
//! 3. **Circuit check**: an open breaker resolves the ticket without a call
//! 4. **Provider call**: form post with semicolon-joined recipients
//! 5. **Record and resolve**: breaker updated, ticket resolved exactly once

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use fenix_core::{Clock, MessageId, RealClock};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    circuit::{CircuitBreaker, CircuitConfig},
    error::{ErrorCategory, Result, SmsError},
    message::{SmsMessage, SmsOutcome, SmsReport},
    provider::SmsProvider,
};

/// Configuration for the dispatch gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Number of concurrent dispatch workers (the bulkhead width).
    pub worker_count: usize,
    /// Capacity of the dispatch queue; a full queue rejects new requests.
    pub queue_capacity: usize,
    /// Status token the provider returns for a successful delivery.
    pub success_status: String,
    /// Circuit breaker settings for the provider.
    pub circuit: CircuitConfig,
    /// Maximum time to wait for workers to drain during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            worker_count: crate::DEFAULT_WORKER_COUNT,
            queue_capacity: crate::DEFAULT_QUEUE_CAPACITY,
            success_status: crate::DEFAULT_SUCCESS_STATUS.to_string(),
            circuit: CircuitConfig::default(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(SmsError::configuration("worker_count must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(SmsError::configuration("queue_capacity must be at least 1"));
        }
        if self.success_status.is_empty() {
            return Err(SmsError::configuration("success_status is empty"));
        }
        if self.circuit.failure_threshold == 0 {
            return Err(SmsError::configuration("failure_threshold must be at least 1"));
        }
        Ok(())
    }
}

/// Gateway activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Requests accepted onto the dispatch queue.
    pub submitted: u64,
    /// Requests confirmed by the provider.
    pub delivered: u64,
    /// Requests that resolved with a failure report.
    pub failed: u64,
    /// Requests rejected synchronously because the queue was full.
    pub rejected: u64,
    /// Requests currently being dispatched.
    pub in_flight: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    in_flight: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> GatewayStats {
        GatewayStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct DispatchJob {
    message_id: MessageId,
    message: SmsMessage,
    reply: oneshot::Sender<SmsReport>,
}

/// Handle resolving to the delivery report of one accepted request.
///
/// The report arrives exactly once. If the gateway stops before the
/// request is dispatched, the report carries `SmsError::GatewayClosed`.
#[derive(Debug)]
pub struct SmsTicket {
    message_id: MessageId,
    receiver: oneshot::Receiver<SmsReport>,
}

impl SmsTicket {
    /// Correlation id assigned to the request.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Waits for the delivery report.
    pub async fn report(self) -> SmsReport {
        match self.receiver.await {
            Ok(report) => report,
            Err(_) => SmsReport {
                message_id: self.message_id,
                outcome: SmsOutcome::Failed { error: SmsError::GatewayClosed },
                completed_at: Utc::now(),
                duration: Duration::ZERO,
            },
        }
    }
}

/// Dispatch gateway guarding a single provider.
///
/// Owns the dispatch queue and worker pool; dropping the gateway without
/// calling [`SmsGateway::shutdown`] cancels the workers between jobs.
#[derive(Debug)]
pub struct SmsGateway {
    provider: Arc<dyn SmsProvider>,
    circuit: Arc<CircuitBreaker>,
    config: GatewayConfig,
    queue: Option<mpsc::Sender<DispatchJob>>,
    workers: Vec<JoinHandle<()>>,
    cancellation_token: CancellationToken,
    counters: Arc<Counters>,
}

impl SmsGateway {
    /// Starts a gateway over the given provider, spawning its dispatch
    /// workers.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Configuration` for invalid settings.
    pub fn start(provider: Arc<dyn SmsProvider>, config: GatewayConfig) -> Result<Self> {
        Self::start_with_clock(provider, config, Arc::new(RealClock))
    }

    /// Starts a gateway with an injected clock for deterministic tests.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Configuration` for invalid settings.
    pub fn start_with_clock(
        provider: Arc<dyn SmsProvider>,
        config: GatewayConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let circuit = Arc::new(CircuitBreaker::with_clock(
            provider.name(),
            config.circuit.clone(),
            clock.clone(),
        ));
        let (queue, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let cancellation_token = CancellationToken::new();
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker = DispatchWorker {
                worker_id,
                queue: receiver.clone(),
                provider: provider.clone(),
                circuit: circuit.clone(),
                clock: clock.clone(),
                counters: counters.clone(),
                success_status: config.success_status.clone(),
                cancellation_token: cancellation_token.clone(),
            };
            workers.push(tokio::spawn(worker.run()));
        }

        info!(
            provider = provider.name(),
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            "notification gateway started"
        );

        Ok(Self {
            provider,
            circuit,
            config,
            queue: Some(queue),
            workers,
            cancellation_token,
            counters,
        })
    }

    /// Submits a message for dispatch.
    ///
    /// Validation happens here, synchronously; nothing is queued and no
    /// provider traffic occurs for an invalid message. The provider call
    /// itself runs on the worker pool, so circuit and provider failures
    /// arrive through the returned ticket, never from this method.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::EmptyMessage` or `SmsError::NoRecipients` for an
    /// invalid message, `SmsError::QueueFull` when the dispatch queue is at
    /// capacity and `SmsError::GatewayClosed` once the gateway has stopped.
    pub fn send(&self, message: SmsMessage) -> Result<SmsTicket> {
        message.validate()?;

        let Some(queue) = &self.queue else {
            return Err(SmsError::GatewayClosed);
        };

        let message_id = MessageId::new();
        let (reply, receiver) = oneshot::channel();
        let job = DispatchJob { message_id, message, reply };

        match queue.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                debug!(message_id = %message_id, "request accepted for dispatch");
                Ok(SmsTicket { message_id, receiver })
            },
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    message_id = %message_id,
                    queue_capacity = self.config.queue_capacity,
                    "dispatch queue full, request rejected"
                );
                Err(SmsError::queue_full(self.config.queue_capacity))
            },
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SmsError::GatewayClosed),
        }
    }

    /// Returns the circuit breaker guarding this gateway's provider.
    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    /// Returns a snapshot of the gateway activity counters.
    pub fn stats(&self) -> GatewayStats {
        self.counters.snapshot()
    }

    /// Gracefully shuts the gateway down.
    ///
    /// Closes the queue so no further requests are accepted, lets the
    /// workers drain already-accepted requests and joins them within the
    /// configured shutdown timeout. Every accepted ticket still resolves.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::ShutdownTimeout` if the workers fail to stop in
    /// time; cancellation is signalled before returning so stragglers stop
    /// between jobs.
    pub async fn shutdown(mut self) -> Result<()> {
        info!(provider = self.provider.name(), "shutting down notification gateway");

        // Dropping the queue sender lets workers drain accepted requests
        // and exit on the closed channel.
        self.queue = None;

        let workers = std::mem::take(&mut self.workers);
        let drain = async {
            for (worker_id, handle) in workers.into_iter().enumerate() {
                if let Err(join_error) = handle.await {
                    error!(worker_id, error = %join_error, "dispatch worker panicked");
                }
            }
        };

        match tokio::time::timeout(self.config.shutdown_timeout, drain).await {
            Ok(()) => {
                info!("notification gateway shutdown completed");
                Ok(())
            },
            Err(_) => {
                self.cancellation_token.cancel();
                error!(
                    timeout_seconds = self.config.shutdown_timeout.as_secs(),
                    "gateway shutdown timed out, cancelling remaining workers"
                );
                Err(SmsError::shutdown_timeout(self.config.shutdown_timeout.as_secs()))
            },
        }
    }
}

impl Drop for SmsGateway {
    fn drop(&mut self) {
        let active = self.workers.iter().any(|handle| !handle.is_finished());
        if active && !self.cancellation_token.is_cancelled() {
            warn!("gateway dropped without shutdown, cancelling dispatch workers");
            self.cancellation_token.cancel();
        }
    }
}

struct DispatchWorker {
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<DispatchJob>>>,
    provider: Arc<dyn SmsProvider>,
    circuit: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
    success_status: String,
    cancellation_token: CancellationToken,
}

impl DispatchWorker {
    async fn run(self) {
        debug!(worker_id = self.worker_id, "dispatch worker started");

        loop {
            // The receiver lock is held only while idle-waiting; it is
            // released before the provider call so other workers can pick
            // up jobs meanwhile.
            let job = {
                let mut queue = self.queue.lock().await;
                tokio::select! {
                    () = self.cancellation_token.cancelled() => None,
                    job = queue.recv() => job,
                }
            };

            let Some(job) = job else { break };
            self.process(job).await;
        }

        debug!(worker_id = self.worker_id, "dispatch worker stopped");
    }

    async fn process(&self, job: DispatchJob) {
        self.counters.in_flight.fetch_add(1, Ordering::Relaxed);
        let started = self.clock.now();

        let outcome = self.attempt(&job.message).await;
        let duration = self.clock.now().duration_since(started);

        match &outcome {
            SmsOutcome::Delivered { status } => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                info!(
                    message_id = %job.message_id,
                    status = %status,
                    duration_ms = duration.as_millis(),
                    "message delivered"
                );
            },
            SmsOutcome::Failed { error } => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    message_id = %job.message_id,
                    category = %ErrorCategory::from(error),
                    error = %error,
                    "message dispatch failed"
                );
            },
        }
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);

        let report = SmsReport {
            message_id: job.message_id,
            outcome,
            completed_at: DateTime::<Utc>::from(self.clock.now_system()),
            duration,
        };

        if job.reply.send(report).is_err() {
            debug!(message_id = %job.message_id, "report receiver dropped before resolution");
        }
    }

    async fn attempt(&self, message: &SmsMessage) -> SmsOutcome {
        if !self.circuit.should_allow().await {
            return SmsOutcome::Failed {
                error: SmsError::circuit_open(self.provider.name()),
            };
        }

        let recipients = message.joined_recipients();
        match self.provider.send_text(message.text(), &recipients, message.properties()).await {
            Ok(status) if status == self.success_status => {
                self.circuit.record_success().await;
                SmsOutcome::Delivered { status }
            },
            Ok(status) => {
                self.circuit.record_failure().await;
                SmsOutcome::Failed { error: SmsError::provider_rejected(status) }
            },
            Err(error) => {
                self.circuit.record_failure().await;
                SmsOutcome::Failed { error }
            },
        }
    }
}
