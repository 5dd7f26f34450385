//! Background dispatcher that drains the outbox to the integration target.

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::config::OutboxConfig;
use crate::models::OutboxEvent;
use crate::telemetry::metrics::record_delivery;
use crate::DbPool;

use super::outbox::OutboxService;
use super::signature;

/// Redelivery schedule in seconds: the r-th failed delivery waits
/// `RETRY_DELAYS[min(r - 1, len - 1)]` before the next attempt.
pub const RETRY_DELAYS: [u64; 5] = [60, 300, 900, 3600, 21600];

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub target_url: String,
    pub signing_secret: String,
    pub batch_size: i64,
    pub poll_interval: Duration,
    pub max_retries: i32,
    pub http_timeout: Duration,
    pub lease: ChronoDuration,
}

impl From<&OutboxConfig> for DispatcherConfig {
    fn from(config: &OutboxConfig) -> Self {
        Self {
            target_url: config.target_url.clone(),
            signing_secret: config.signing_secret.clone(),
            batch_size: config.batch_size,
            poll_interval: config.poll_interval(),
            max_retries: config.max_retries,
            http_timeout: config.http_timeout(),
            lease: ChronoDuration::seconds(config.lease_secs),
        }
    }
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered,
    Retryable(String),
    NonRetryable(String),
}

pub struct OutboxDispatcher {
    db_pool: DbPool,
    config: DispatcherConfig,
    client: reqwest::Client,
}

impl OutboxDispatcher {
    pub fn new(db_pool: DbPool, config: DispatcherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            db_pool,
            config,
            client,
        }
    }

    pub fn spawn(self) -> watch::Sender<bool> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        shutdown_tx
    }

    #[instrument(skip(self, shutdown_rx), name = "outbox_dispatcher")]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            target_url = %self.config.target_url,
            poll_interval_ms = self.config.poll_interval.as_millis(),
            batch_size = self.config.batch_size,
            max_retries = self.config.max_retries,
            "Outbox dispatcher started"
        );

        let mut poll_timer = interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = poll_timer.tick() => {
                    if let Err(e) = self.poll_and_deliver().await {
                        error!(error = %e, "Error polling/delivering events");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Outbox dispatcher received shutdown signal");
                        break;
                    }
                }
            }
        }

        info!("Draining remaining events before shutdown...");
        for _ in 0..3 {
            match self.poll_and_deliver().await {
                Ok(0) => break,
                Ok(n) => debug!(count = n, "Drained events"),
                Err(e) => {
                    error!(error = %e, "Error during final drain");
                    break;
                }
            }
        }

        info!("Outbox dispatcher stopped");
    }

    #[instrument(skip(self))]
    async fn poll_and_deliver(&self) -> Result<usize, DispatchError> {
        let events = {
            let pool = self.db_pool.clone();
            let batch_size = self.config.batch_size;
            let lease = self.config.lease;

            tokio::task::spawn_blocking(move || {
                let mut conn = pool
                    .get()
                    .map_err(|e| DispatchError::Database(e.to_string()))?;
                OutboxService::claim_batch(&mut conn, batch_size, lease)
                    .map_err(|e| DispatchError::Database(e.to_string()))
            })
            .await
            .map_err(|e| DispatchError::Task(e.to_string()))??
        };

        if events.is_empty() {
            return Ok(0);
        }

        debug!(count = events.len(), "Claimed outbox batch");

        for event in &events {
            let outcome = self.deliver(event).await;
            self.apply_outcome(event, outcome).await?;
        }

        Ok(events.len())
    }

    /// One delivery attempt, outside any database transaction.
    #[instrument(skip(self, event), fields(event_id = %event.event_id, event_name = %event.event_name))]
    async fn deliver(&self, event: &OutboxEvent) -> DeliveryOutcome {
        let body = event.payload.to_string();
        let timestamp = Utc::now().timestamp();
        let sig = signature::sign(&self.config.signing_secret, timestamp, &body);

        let response = self
            .client
            .post(&self.config.target_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Event-Id", &event.event_id)
            .header("X-Event-Name", &event.event_name)
            .header("X-Timestamp", timestamp.to_string())
            .header("X-Signature", sig)
            .body(body)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                classify_status(status, body)
            }
            // Connection refusals, DNS failures, and timeouts all warrant
            // another attempt.
            Err(e) => DeliveryOutcome::Retryable(e.to_string()),
        }
    }

    async fn apply_outcome(
        &self,
        event: &OutboxEvent,
        outcome: DeliveryOutcome,
    ) -> Result<(), DispatchError> {
        let pool = self.db_pool.clone();
        let id = event.id;
        let event_id = event.event_id.clone();
        let retry_count = event.retry_count;
        let max_retries = self.config.max_retries;

        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DispatchError::Database(e.to_string()))?;

            match outcome {
                DeliveryOutcome::Delivered => {
                    record_delivery("sent");
                    info!(event_id = %event_id, "Event delivered");
                    OutboxService::mark_sent(&mut conn, id)
                }
                DeliveryOutcome::Retryable(reason) => {
                    let attempt = retry_count + 1;
                    if attempt > max_retries {
                        record_delivery("exhausted");
                        warn!(event_id = %event_id, attempt, reason = %reason, "Retries exhausted, parking event");
                        OutboxService::park(&mut conn, id, attempt, &reason)
                    } else {
                        record_delivery("retried");
                        let next = Utc::now() + retry_delay(attempt);
                        debug!(event_id = %event_id, attempt, next_attempt = %next, "Scheduling redelivery");
                        OutboxService::schedule_retry(&mut conn, id, attempt, next, &reason)
                    }
                }
                DeliveryOutcome::NonRetryable(reason) => {
                    record_delivery("rejected");
                    warn!(event_id = %event_id, reason = %reason, "Receiver rejected event, parking");
                    OutboxService::park(&mut conn, id, retry_count + 1, &reason)
                }
            }
            .map_err(|e| DispatchError::Database(e.to_string()))
        })
        .await
        .map_err(|e| DispatchError::Task(e.to_string()))?
    }
}

/// 2xx is success; 408/429 and every 5xx warrant a retry; any other 4xx
/// marks a malformed request and parks the event with the response body.
fn classify_status(status: StatusCode, body: String) -> DeliveryOutcome {
    if status.is_success() {
        return DeliveryOutcome::Delivered;
    }

    let detail = format!("HTTP {}: {}", status.as_u16(), truncate(&body, 512));

    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS {
        return DeliveryOutcome::Retryable(detail);
    }
    if status.is_client_error() {
        return DeliveryOutcome::NonRetryable(detail);
    }
    DeliveryOutcome::Retryable(detail)
}

/// Delay before the next attempt, where `attempt` is the 1-based count of
/// failed deliveries so far. The schedule saturates at its last entry.
pub fn retry_delay(attempt: i32) -> ChronoDuration {
    let index = (attempt.max(1) as usize - 1).min(RETRY_DELAYS.len() - 1);
    ChronoDuration::seconds(RETRY_DELAYS[index] as i64)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Task error: {0}")]
    Task(String),
}
