//! Background delivery of preemption alerts.
//!
//! Fix handling never waits on the bus: alerts are queued on a bounded
//! channel and a single worker publishes them with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use domain::models::{AlertEvent, AlertState};
use domain::services::{AlertPublisher, PublishError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::PublisherConfig;
use crate::middleware::metrics::{record_alert_dropped, record_publish_failure};

/// Retry settings for a single alert.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(10);
        self.base_delay * (1u32 << shift)
    }
}

impl From<&PublisherConfig> for RetryPolicy {
    fn from(config: &PublisherConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

/// An alert serialized and ready for the bus.
#[derive(Debug)]
struct QueuedAlert {
    topic: String,
    payload: Vec<u8>,
    state: AlertState,
}

/// Handle for queuing alerts. Cheap to clone; the worker stops once every
/// handle is dropped and the queue is drained.
#[derive(Clone)]
pub struct AlertDispatcher {
    tx: mpsc::Sender<QueuedAlert>,
    topic_prefix: Arc<str>,
}

impl AlertDispatcher {
    /// Starts the delivery worker.
    pub fn spawn(
        publisher: Arc<dyn AlertPublisher>,
        config: &PublisherConfig,
    ) -> (Self, AlertWorker) {
        let (dispatcher, rx) = Self::channel(config.queue_capacity, &config.topic_prefix);
        let policy = RetryPolicy::from(config);
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_worker(rx, stop_rx, publisher, policy));
        (dispatcher, AlertWorker { stop, handle })
    }

    fn channel(capacity: usize, topic_prefix: &str) -> (Self, mpsc::Receiver<QueuedAlert>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                topic_prefix: Arc::from(topic_prefix),
            },
            rx,
        )
    }

    /// Queues an alert for delivery. Returns `false` when it was dropped.
    pub fn dispatch(&self, alert: &AlertEvent) -> bool {
        let payload = match alert.payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, topic = %alert.signal_topic, "Failed to serialize alert");
                return false;
            }
        };
        let queued = QueuedAlert {
            topic: alert.topic(&self.topic_prefix),
            payload,
            state: alert.state,
        };

        match self.tx.try_send(queued) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!(topic = %dropped.topic, state = %dropped.state, "Alert queue full, dropping alert");
                record_alert_dropped();
                false
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(topic = %dropped.topic, "Alert worker stopped, dropping alert");
                record_alert_dropped();
                false
            }
        }
    }
}

/// Handle to the delivery worker task.
///
/// Dropping it leaves the worker running until every dispatcher is gone.
pub struct AlertWorker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AlertWorker {
    /// Waits for the worker to exit once every dispatcher is dropped.
    pub async fn join(self) -> Result<(), JoinError> {
        self.handle.await
    }

    /// Closes the queue to new alerts, then waits until the queued ones are
    /// handled. Dispatchers that outlive this drop their alerts.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.stop.send_replace(true);
        self.handle.await
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<QueuedAlert>,
    mut stop: watch::Receiver<bool>,
    publisher: Arc<dyn AlertPublisher>,
    policy: RetryPolicy,
) {
    debug!("Alert dispatch worker started");
    loop {
        tokio::select! {
            alert = rx.recv() => match alert {
                Some(alert) => deliver(publisher.as_ref(), alert, policy).await,
                None => break,
            },
            // A dropped `AlertWorker` disables this branch
            Ok(()) = stop.changed() => {
                if *stop.borrow() {
                    debug!("Alert queue closed, draining");
                    rx.close();
                }
            }
        }
    }
    debug!("Alert dispatch worker stopped");
}

async fn deliver(publisher: &dyn AlertPublisher, alert: QueuedAlert, policy: RetryPolicy) {
    match publish_with_retry(publisher, &alert.topic, &alert.payload, policy).await {
        Ok(attempts) => info!(
            topic = %alert.topic,
            state = %alert.state,
            attempts,
            "Preemption alert published"
        ),
        Err(e) => {
            record_publish_failure();
            error!(
                topic = %alert.topic,
                state = %alert.state,
                error = %e,
                "Failed to publish preemption alert"
            );
        }
    }
}

/// Publishes with exponential backoff. Returns the number of attempts made.
///
/// Rejected publishes are not retried.
pub async fn publish_with_retry(
    publisher: &dyn AlertPublisher,
    topic: &str,
    payload: &[u8],
    policy: RetryPolicy,
) -> Result<u32, PublishError> {
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff(attempt)).await;
        }
        match publisher.publish(topic, payload).await {
            Ok(()) => return Ok(attempt + 1),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                warn!(topic = %topic, attempt = attempt + 1, error = %e, "Alert publish failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
