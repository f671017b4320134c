//! User feedback delivery.
//!
//! Handlers hand messages to a `FeedbackQueue`, which answers immediately
//! and lets a single background worker push them through a
//! `FeedbackTransport` (SMTP, or the log when mail is not configured),
//! retrying failed deliveries with a linear backoff.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::FeedbackConfig;
use crate::error::SizingError;
use crate::models::sizing::FeedbackReceipt;

const FEEDBACK_SUBJECT: &str = "New feedback";

#[derive(Debug, Clone)]
pub struct QueuedFeedback {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub message: String,
}

#[async_trait]
pub trait FeedbackNotifier: Send + Sync {
    /// Accepts a message for delivery. Does not wait for the delivery itself.
    async fn send(&self, message: &str) -> Result<FeedbackReceipt, SizingError>;
}

#[async_trait]
pub trait FeedbackTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, feedback: &QueuedFeedback) -> Result<(), SizingError>;
}

// ─── Transports ──────────────────────────────────────────────────────────────

pub struct SmtpFeedbackTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpFeedbackTransport {
    pub fn new(config: &FeedbackConfig) -> Result<Self> {
        let from: Mailbox = config
            .from_address
            .parse()
            .with_context(|| format!("Invalid from_address: {}", config.from_address))?;
        let to: Mailbox = config
            .to_address
            .parse()
            .with_context(|| format!("Invalid to_address: {}", config.to_address))?;

        let username = std::env::var(&config.username_env)
            .with_context(|| format!("SMTP username variable {} is not set", config.username_env))?;
        let password = std::env::var(&config.password_env)
            .with_context(|| format!("SMTP password variable {} is not set", config.password_env))?;
        let creds = Credentials::new(username, password);

        let transport = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .with_context(|| format!("Failed to create SMTP relay: {}", config.smtp_host))?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self { transport, from, to })
    }
}

#[async_trait]
impl FeedbackTransport for SmtpFeedbackTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn deliver(&self, feedback: &QueuedFeedback) -> Result<(), SizingError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(FEEDBACK_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(feedback.message.clone())
            .map_err(|e| SizingError::DeliveryFailure(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| SizingError::DeliveryFailure(e.to_string()))
    }
}

/// Used when no mail server is configured: the message only reaches the log.
pub struct LogFeedbackTransport;

#[async_trait]
impl FeedbackTransport for LogFeedbackTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, feedback: &QueuedFeedback) -> Result<(), SizingError> {
        info!(id = %feedback.id, received_at = %feedback.received_at, message = %feedback.message, "feedback received");
        Ok(())
    }
}

// ─── Queue + worker ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before retry n is `base_delay * n`
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

pub struct FeedbackQueue {
    sender: mpsc::Sender<QueuedFeedback>,
}

impl FeedbackQueue {
    /// Spawns the delivery worker. It exits once every queue handle is dropped
    /// and the backlog is drained; see `drain_worker`.
    pub fn start(
        transport: Arc<dyn FeedbackTransport>,
        capacity: usize,
        policy: RetryPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        info!(transport = transport.name(), capacity, max_attempts = policy.max_attempts, "feedback worker starting");
        let handle = tokio::spawn(run_worker(receiver, transport, policy));
        (Self { sender }, handle)
    }
}

#[async_trait]
impl FeedbackNotifier for FeedbackQueue {
    async fn send(&self, message: &str) -> Result<FeedbackReceipt, SizingError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SizingError::invalid("feedback message is empty"));
        }

        let feedback = QueuedFeedback {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            message: message.to_string(),
        };
        let receipt = FeedbackReceipt { id: feedback.id, accepted_at: feedback.received_at };

        self.sender.try_send(feedback).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                SizingError::DeliveryFailure("feedback queue is full, try again later".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                SizingError::DeliveryFailure("feedback delivery is not running".to_string())
            }
        })?;
        Ok(receipt)
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<QueuedFeedback>,
    transport: Arc<dyn FeedbackTransport>,
    policy: RetryPolicy,
) {
    while let Some(feedback) = receiver.recv().await {
        match deliver_with_retry(transport.as_ref(), &feedback, policy).await {
            Ok(attempts) => info!(id = %feedback.id, attempts, "feedback delivered"),
            Err(e) => error!(id = %feedback.id, error = %e, "feedback dropped after retries"),
        }
    }
    info!("feedback worker stopped");
}

/// Waits up to `limit` for a stopped queue's worker to finish its backlog,
/// retries included. Returns false if messages may have been left undelivered.
pub async fn drain_worker(worker: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, worker).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(error = %e, "feedback worker aborted");
            false
        }
        Err(_) => {
            warn!(timeout_ms = limit.as_millis() as u64, "feedback backlog not drained before shutdown");
            false
        }
    }
}

/// Returns the number of attempts it took.
pub async fn deliver_with_retry(
    transport: &dyn FeedbackTransport,
    feedback: &QueuedFeedback,
    policy: RetryPolicy,
) -> Result<u32, SizingError> {
    let mut attempt = 1;
    loop {
        match transport.deliver(feedback).await {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt < policy.max_attempts => {
                warn!(id = %feedback.id, attempt, error = %e, "feedback delivery failed, retrying");
                tokio::time::sleep(policy.base_delay * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails the first `failures` calls, then records what it delivers.
    struct FlakyTransport {
        failures: u32,
        calls: AtomicU32,
        delivered: Mutex<Vec<String>>,
    }

    impl FlakyTransport {
        fn new(failures: u32) -> Self {
            Self { failures, calls: AtomicU32::new(0), delivered: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl FeedbackTransport for FlakyTransport {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn deliver(&self, feedback: &QueuedFeedback) -> Result<(), SizingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SizingError::DeliveryFailure("connection refused".to_string()));
            }
            self.delivered.lock().unwrap().push(feedback.message.clone());
            Ok(())
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, base_delay: Duration::from_millis(1) }
    }

    fn feedback(message: &str) -> QueuedFeedback {
        QueuedFeedback { id: Uuid::new_v4(), received_at: Utc::now(), message: message.to_string() }
    }

    #[tokio::test]
    async fn retries_until_delivered() {
        let transport = FlakyTransport::new(2);
        let attempts = deliver_with_retry(&transport, &feedback("hi"), fast_policy(3)).await.unwrap();
        assert_eq!(attempts, 3);
        assert_eq!(*transport.delivered.lock().unwrap(), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let transport = FlakyTransport::new(5);
        let err = deliver_with_retry(&transport, &feedback("hi"), fast_policy(2)).await.unwrap_err();
        assert!(matches!(err, SizingError::DeliveryFailure(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn queue_delivers_in_background() {
        let transport = Arc::new(FlakyTransport::new(1));
        let (queue, worker) = FeedbackQueue::start(transport.clone(), 4, fast_policy(3));

        let receipt = queue.send("  great tool  ").await.unwrap();
        queue.send("second").await.unwrap();
        drop(queue);
        worker.await.unwrap();

        assert!(receipt.accepted_at <= Utc::now());
        assert_eq!(
            *transport.delivered.lock().unwrap(),
            vec!["great tool".to_string(), "second".to_string()]
        );
    }

    #[tokio::test]
    async fn drain_waits_for_pending_retries() {
        let transport = Arc::new(FlakyTransport::new(2));
        let policy = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(20) };
        let (queue, worker) = FeedbackQueue::start(transport.clone(), 4, policy);

        queue.send("late").await.unwrap();
        drop(queue);

        assert!(drain_worker(worker, Duration::from_secs(5)).await);
        assert_eq!(*transport.delivered.lock().unwrap(), vec!["late".to_string()]);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    /// Never completes a delivery.
    struct StuckTransport;

    #[async_trait]
    impl FeedbackTransport for StuckTransport {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn deliver(&self, _feedback: &QueuedFeedback) -> Result<(), SizingError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn drain_gives_up_after_limit() {
        let (queue, worker) = FeedbackQueue::start(Arc::new(StuckTransport), 4, fast_policy(1));
        queue.send("stuck").await.unwrap();
        drop(queue);

        assert!(!drain_worker(worker, Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (queue, _worker) = FeedbackQueue::start(Arc::new(LogFeedbackTransport), 1, fast_policy(1));
        assert!(matches!(queue.send("   \n").await, Err(SizingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn full_or_closed_queue_is_a_delivery_failure() {
        let (sender, receiver) = mpsc::channel(1);
        let queue = FeedbackQueue { sender };

        queue.send("first").await.unwrap();
        assert!(matches!(queue.send("second").await, Err(SizingError::DeliveryFailure(_))));

        drop(receiver);
        assert!(matches!(queue.send("third").await, Err(SizingError::DeliveryFailure(_))));
    }
}
