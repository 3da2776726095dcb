//! # Event Publishing
//!
//! Transmits signed events to relays through an injected [`RelayTransport`],
//! retrying with exponential backoff until at least one relay acknowledges.
//! Every `publish` call appends its final outcome to the [`PublishHistory`],
//! which backs status lookups and replays.
//!
//! Attempt `n` (zero-based) waits at most `timeout * factor^n`; retry `n`
//! (one-based) is preceded by a sleep of `base_delay * factor^(n-1)`.

pub mod history;
pub mod transport;

use crate::config::PublishingConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Event, PublishAttempt, PublishHistoryEntry, PublishResult};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

pub use history::PublishHistory;
pub use transport::RelayTransport;

/// Per-call overrides of the configured publishing behaviour
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Relays to use instead of the default list
    pub relays: Option<Vec<String>>,
    /// Timeout of the first attempt
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

impl PublishOptions {
    pub fn to_relays<I, S>(relays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            relays: Some(relays.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

pub struct PublishingService {
    transport: Arc<dyn RelayTransport>,
    config: PublishingConfig,
    default_relays: RwLock<Vec<String>>,
    history: PublishHistory,
}

impl std::fmt::Debug for PublishingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishingService")
            .field("config", &self.config)
            .field("default_relays", &*self.default_relays.read())
            .field("history_entries", &self.history.len())
            .finish()
    }
}

/// Timeout of zero-based attempt `attempt`
pub fn attempt_timeout(base: Duration, factor: u32, attempt: u32) -> Duration {
    base.saturating_mul(factor.saturating_pow(attempt))
}

/// Sleep before one-based retry `retry`
pub fn backoff_delay(base: Duration, factor: u32, retry: u32) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }
    base.saturating_mul(factor.saturating_pow(retry - 1))
}

impl PublishingService {
    pub fn new(
        transport: Arc<dyn RelayTransport>,
        config: PublishingConfig,
        default_relays: Vec<String>,
    ) -> Self {
        Self {
            transport,
            config,
            default_relays: RwLock::new(default_relays),
            history: PublishHistory::new(),
        }
    }

    pub fn default_relays(&self) -> Vec<String> {
        self.default_relays.read().clone()
    }

    pub fn set_default_relays(&self, relays: Vec<String>) {
        *self.default_relays.write() = relays;
    }

    pub fn history(&self) -> &PublishHistory {
        &self.history
    }

    /// Publish `event`; succeeds when at least one relay acknowledges
    #[instrument(skip(self, event, options), fields(event_id = %event.id))]
    pub async fn publish(&self, event: &Event, options: &PublishOptions) -> PublishResult {
        let relays = options
            .relays
            .clone()
            .unwrap_or_else(|| self.default_relays());
        let max_retries = options.max_retries.unwrap_or(self.config.max_retries);
        let base_timeout = options.timeout.unwrap_or_else(|| self.config.timeout());
        let base_delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let factor = self.config.backoff_factor;

        if relays.is_empty() {
            let result = PublishResult {
                success: false,
                published_to: Vec::new(),
                error: Some("no relays configured".to_string()),
                attempts: Vec::new(),
            };
            self.history.record(event, &result);
            return result;
        }

        let mut attempts = Vec::new();
        let mut last_error = String::new();

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = backoff_delay(base_delay, factor, attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                sleep(delay).await;
            }

            let attempt_timeout = attempt_timeout(base_timeout, factor, attempt);
            let error = match timeout(
                attempt_timeout,
                self.transport.publish_to_relays(event, &relays),
            )
            .await
            {
                Ok(Ok(acknowledged)) if !acknowledged.is_empty() => {
                    let mut published_to: Vec<String> = Vec::with_capacity(acknowledged.len());
                    for relay in acknowledged {
                        if !published_to.contains(&relay) {
                            published_to.push(relay);
                        }
                    }
                    attempts.push(PublishAttempt {
                        attempt,
                        timeout_ms: attempt_timeout.as_millis() as u64,
                        acknowledged: published_to.len(),
                        error: None,
                    });
                    info!(
                        attempt,
                        relay_count = relays.len(),
                        acknowledged = published_to.len(),
                        "Event published"
                    );
                    let result = PublishResult {
                        success: true,
                        published_to,
                        error: None,
                        attempts,
                    };
                    self.history.record(event, &result);
                    return result;
                }
                Ok(Ok(_)) => "no relay acknowledged the event".to_string(),
                Ok(Err(e)) => format!("transport error: {e}"),
                Err(_) => format!("timed out after {}ms", attempt_timeout.as_millis()),
            };

            warn!(attempt, max_retries, error = %error, "Publish attempt failed");
            attempts.push(PublishAttempt {
                attempt,
                timeout_ms: attempt_timeout.as_millis() as u64,
                acknowledged: 0,
                error: Some(error.clone()),
            });
            last_error = error;
        }

        let result = PublishResult {
            success: false,
            published_to: Vec::new(),
            error: Some(format!(
                "failed to publish after {} attempts: {last_error}",
                attempts.len()
            )),
            attempts,
        };
        self.history.record(event, &result);
        result
    }

    /// Latest history entry for an event id
    pub fn get_publish_status(&self, event_id: &str) -> Option<PublishHistoryEntry> {
        self.history.latest(event_id)
    }

    /// Replay `publish` for a previously published event against the current
    /// relay list. Fails when no history exists for `event_id`.
    pub async fn retry_publish(&self, event_id: &str, options: &PublishOptions) -> Result<PublishResult> {
        let entry = self.history.latest(event_id).ok_or_else(|| {
            PipelineError::event_management(format!("no publish history for event {event_id}"))
        })?;
        info!(event_id, "Retrying publication");
        Ok(self.publish(&entry.event, options).await)
    }
}
