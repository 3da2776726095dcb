//! # Event Manager
//!
//! The coordinator and only public surface of the pipeline. It wires
//! validation, signing, publishing, queueing and monitoring together and owns
//! the `sign_and_publish` queue processor used for asynchronous submissions.
//!
//! ## Lifecycle per event id
//!
//! ```text
//! created → validated → queued → signed → published
//!                    ↘ (queued →) failed
//! ```
//!
//! Records are keyed by the event's content address, computed before
//! signing, so every stage of one event lands on the same record.
//!
//! Expected failures (invalid event, missing credentials, unreachable relays)
//! come back as [`SigningOutcome`] / [`SubmissionOutcome`] /
//! [`PublishResult`] values. Only programmer errors such as unknown ids
//! return `Err`.

use crate::config::PipelineConfig;
use crate::constants::LifecycleStatus;
use crate::error::{PipelineError, Result};
use crate::logging::{log_error, log_event_operation};
use crate::models::{
    Event, EventMetrics, EventStatus, PublishResult, QueuedEvent, StatusChange, SubmitOptions,
    Tag, UnsignedEvent,
};
use crate::orchestration::event_monitor::EventMonitor;
use crate::orchestration::queue_manager::{processor, QueueManager, QueueStatus};
use crate::services::publishing::{PublishOptions, PublishingService, RelayTransport};
use crate::services::signing::{KeyUnlocker, SigningAgent, SigningOptions, SigningOutcome, SigningService};
use crate::services::validation::ValidationService;
use chrono::Utc;
use dashmap::DashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Name under which the manager registers its queue processor
pub const SIGN_AND_PUBLISH_PROCESSOR: &str = "sign_and_publish";

/// Result of [`EventManager::sign_and_publish_event`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Signed synchronously (`skip_publish`); nothing was published
    Signed {
        event: Event,
        published_to: Vec<String>,
    },
    /// Accepted for background signing and publishing
    Queued {
        pending_id: String,
        event_id: String,
    },
    Failed {
        error: PipelineError,
    },
    NeedsPassword {
        error: PipelineError,
    },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SubmissionOutcome::Signed { .. } | SubmissionOutcome::Queued { .. }
        )
    }

    pub fn needs_password(&self) -> bool {
        matches!(self, SubmissionOutcome::NeedsPassword { .. })
    }

    pub fn pending_id(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Queued { pending_id, .. } => Some(pending_id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            SubmissionOutcome::Failed { error } | SubmissionOutcome::NeedsPassword { error } => {
                Some(error)
            }
            _ => None,
        }
    }
}

/// Content address used to key lifecycle records before a signature exists
pub(crate) fn tracking_id(event: &UnsignedEvent) -> String {
    event
        .compute_id()
        .unwrap_or_else(|_| format!("unhashable:{}:{}", event.pubkey, event.created_at))
}

/// Wires collaborators into an [`EventManager`]
#[derive(Default)]
pub struct EventManagerBuilder {
    config: PipelineConfig,
    agent: Option<Arc<dyn SigningAgent>>,
    unlocker: Option<Arc<dyn KeyUnlocker>>,
    transport: Option<Arc<dyn RelayTransport>>,
    validation: Option<ValidationService>,
}

impl EventManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn signing_agent(mut self, agent: Arc<dyn SigningAgent>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn key_unlocker(mut self, unlocker: Arc<dyn KeyUnlocker>) -> Self {
        self.unlocker = Some(unlocker);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn RelayTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the default validators (e.g. with extra kind rules)
    pub fn validation(mut self, validation: ValidationService) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn build(self) -> Result<EventManager> {
        self.config.validate()?;
        let transport = self.transport.ok_or_else(|| {
            PipelineError::Configuration("a relay transport is required".to_string())
        })?;

        let validation = self
            .validation
            .unwrap_or_else(|| ValidationService::new(&self.config.validation));
        let signing = SigningService::new(self.config.signing.clone(), self.agent, self.unlocker);
        let publishing = PublishingService::new(
            transport,
            self.config.publishing.clone(),
            self.config.relays.default_relays.clone(),
        );

        Ok(EventManager::from_parts(
            self.config,
            validation,
            signing,
            publishing,
        ))
    }
}

pub struct EventManager {
    config: PipelineConfig,
    validation: Arc<ValidationService>,
    signing: Arc<SigningService>,
    publishing: Arc<PublishingService>,
    queue: Arc<QueueManager>,
    monitor: Arc<EventMonitor>,
    retries_in_flight: DashSet<String>,
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("signing", &self.signing)
            .field("publishing", &self.publishing)
            .field("queue", &self.queue)
            .field("tracked_events", &self.monitor.tracked_count())
            .finish()
    }
}

/// Removes the retry guard for an id when the retry finishes
struct RetryGuard<'a> {
    set: &'a DashSet<String>,
    event_id: String,
}

impl Drop for RetryGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.event_id);
    }
}

impl EventManager {
    pub fn builder() -> EventManagerBuilder {
        EventManagerBuilder::new()
    }

    /// Assemble a manager from ready-made services and register the
    /// `sign_and_publish` processor. The scheduler is not started.
    pub fn from_parts(
        config: PipelineConfig,
        validation: ValidationService,
        signing: SigningService,
        publishing: PublishingService,
    ) -> Self {
        let signing = Arc::new(signing);
        let publishing = Arc::new(publishing);
        let monitor = Arc::new(EventMonitor::new());
        let queue = Arc::new(QueueManager::new(config.queue.clone()));

        let manager = Self {
            config,
            validation: Arc::new(validation),
            signing,
            publishing,
            queue,
            monitor,
            retries_in_flight: DashSet::new(),
        };
        manager.register_queue_processor();
        manager
    }

    fn register_queue_processor(&self) {
        let signing = Arc::clone(&self.signing);
        let publishing = Arc::clone(&self.publishing);
        let monitor = Arc::clone(&self.monitor);
        self.queue.register_processor(
            SIGN_AND_PUBLISH_PROCESSOR,
            processor(move |item| {
                let signing = Arc::clone(&signing);
                let publishing = Arc::clone(&publishing);
                let monitor = Arc::clone(&monitor);
                async move { process_queued_event(item, &signing, &publishing, &monitor).await }
            }),
        );
    }

    /// Start the background queue scheduler
    pub fn start(&self) {
        self.queue.start_processing();
        info!(
            relays = self.publishing.default_relays().len(),
            signing_methods = ?self.signing.method_names(),
            "Event manager started"
        );
    }

    /// Stop the scheduler; items already being processed run to completion
    pub fn shutdown(&self) {
        self.queue.stop_processing();
        info!("Event manager shut down");
    }

    /// Stamp a new unsigned event with the local identity and the current time
    #[instrument(skip(self, content, tags))]
    pub async fn create_event(
        &self,
        kind: u32,
        content: impl Into<String>,
        tags: Vec<Tag>,
    ) -> Result<UnsignedEvent> {
        let pubkey = self.signing.get_public_key().await?;
        let event = UnsignedEvent {
            kind,
            created_at: Utc::now().timestamp(),
            tags,
            content: content.into(),
            pubkey,
        };

        let event_id = tracking_id(&event);
        self.monitor
            .track_event(&event_id, EventStatus::new(LifecycleStatus::Created));
        log_event_operation("create", Some(&event_id), Some(kind), "created", None);
        Ok(event)
    }

    /// Validate then sign. Never returns `Err`; failures are outcome variants.
    #[instrument(skip(self, event, options), fields(kind = event.kind))]
    pub async fn sign_event(&self, event: &UnsignedEvent, options: &SigningOptions) -> SigningOutcome {
        let event_id = tracking_id(event);
        if let Err(error) = self.validate(&event_id, event) {
            return SigningOutcome::Failed { error };
        }
        self.sign_validated(&event_id, event, options).await
    }

    /// Publish an already signed event, recording `published` or `failed`
    #[instrument(skip(self, event, options), fields(event_id = %event.id))]
    pub async fn publish_event(&self, event: &Event, options: &PublishOptions) -> PublishResult {
        let result = self.publishing.publish(event, options).await;
        record_publish_result(&self.monitor, &event.id, event.kind, &result);
        result
    }

    /// Validate, then either sign synchronously (`skip_publish`) or hand the
    /// event to the queue for background signing and publishing.
    #[instrument(skip(self, event, options), fields(kind = event.kind))]
    pub async fn sign_and_publish_event(
        &self,
        event: UnsignedEvent,
        options: SubmitOptions,
    ) -> SubmissionOutcome {
        let event_id = tracking_id(&event);
        if let Err(error) = self.validate(&event_id, &event) {
            return SubmissionOutcome::Failed { error };
        }

        if options.skip_publish {
            return match self.sign_validated(&event_id, &event, &options.signing).await {
                SigningOutcome::Signed { event, .. } => SubmissionOutcome::Signed {
                    event,
                    published_to: Vec::new(),
                },
                SigningOutcome::Failed { error } => SubmissionOutcome::Failed { error },
                SigningOutcome::NeedsPassword { error } => SubmissionOutcome::NeedsPassword { error },
            };
        }

        let kind = event.kind;
        let priority = options.priority;
        match self.queue.enqueue(event, priority, options) {
            Ok(item) => {
                self.monitor
                    .track_event(&event_id, EventStatus::new(LifecycleStatus::Queued));
                log_event_operation("submit", Some(&event_id), Some(kind), "queued", Some(&item.id));
                SubmissionOutcome::Queued {
                    pending_id: item.id,
                    event_id,
                }
            }
            Err(error) => {
                self.monitor
                    .track_event(&event_id, EventStatus::failed(error.to_string()));
                log_error("event_manager", "enqueue", &error.to_string(), Some(&event_id));
                SubmissionOutcome::Failed { error }
            }
        }
    }

    pub fn get_event_status(&self, event_id: &str) -> Option<EventStatus> {
        self.monitor.get_status(event_id)
    }

    pub fn get_event_history(&self, event_id: Option<&str>) -> Vec<(String, EventStatus)> {
        self.monitor.get_event_history(event_id)
    }

    /// Re-publish a previously attempted event from publish history.
    ///
    /// Fails for unknown ids, ids already published, ids with no publish
    /// history, and while another retry of the same id is running.
    #[instrument(skip(self))]
    pub async fn retry_event(&self, event_id: &str) -> Result<PublishResult> {
        if self.monitor.get_status(event_id).is_none() {
            return Err(PipelineError::event_management(format!(
                "no status recorded for event {event_id}"
            )));
        }

        if !self.retries_in_flight.insert(event_id.to_string()) {
            return Err(PipelineError::event_management(format!(
                "a retry of event {event_id} is already in progress"
            )));
        }
        let _guard = RetryGuard {
            set: &self.retries_in_flight,
            event_id: event_id.to_string(),
        };
        // Checked under the guard so a retry that just finished is seen.
        if self
            .monitor
            .get_status(event_id)
            .is_some_and(|s| s.status == LifecycleStatus::Published)
        {
            return Err(PipelineError::event_management(format!(
                "event {event_id} is already published"
            )));
        }

        let result = self
            .publishing
            .retry_publish(event_id, &PublishOptions::default())
            .await?;
        let kind = self
            .publishing
            .get_publish_status(event_id)
            .map(|entry| entry.event.kind);
        record_publish_result(&self.monitor, event_id, kind.unwrap_or_default(), &result);
        Ok(result)
    }

    /// Queued items cannot be withdrawn
    pub fn cancel_event(&self, event_id: &str) -> Result<()> {
        Err(PipelineError::event_management(format!(
            "cancellation is not supported (event {event_id})"
        )))
    }

    pub fn get_metrics(&self) -> EventMetrics {
        self.monitor.get_metrics()
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        self.queue.get_queue_status()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusChange> {
        self.monitor.subscribe()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn monitor(&self) -> &EventMonitor {
        &self.monitor
    }

    pub fn publishing(&self) -> &PublishingService {
        &self.publishing
    }

    pub fn signing(&self) -> &SigningService {
        &self.signing
    }

    fn validate(&self, event_id: &str, event: &UnsignedEvent) -> Result<()> {
        match self.validation.validate(event) {
            Ok(_) => {
                self.monitor
                    .track_event(event_id, EventStatus::new(LifecycleStatus::Validated));
                Ok(())
            }
            Err(error) => {
                self.monitor
                    .track_event(event_id, EventStatus::failed(error.to_string()));
                log_event_operation(
                    "validate",
                    Some(event_id),
                    Some(event.kind),
                    "failed",
                    Some(&error.to_string()),
                );
                Err(error)
            }
        }
    }

    async fn sign_validated(
        &self,
        event_id: &str,
        event: &UnsignedEvent,
        options: &SigningOptions,
    ) -> SigningOutcome {
        let outcome = self.signing.sign(event, options).await;
        record_signing_outcome(&self.monitor, event_id, event.kind, &outcome);
        outcome
    }
}

fn record_signing_outcome(
    monitor: &EventMonitor,
    event_id: &str,
    kind: u32,
    outcome: &SigningOutcome,
) {
    match outcome {
        SigningOutcome::Signed { event, method } => {
            monitor.rekey(event_id, &event.id);
            monitor.track_event(&event.id, EventStatus::new(LifecycleStatus::Signed));
            log_event_operation("sign", Some(&event.id), Some(kind), "signed", Some(method));
        }
        // Awaiting a password is not terminal; the record stays where it was
        SigningOutcome::NeedsPassword { .. } => {
            log_event_operation("sign", Some(event_id), Some(kind), "needs_password", None);
        }
        SigningOutcome::Failed { error } => {
            monitor.track_event(event_id, EventStatus::failed(error.to_string()));
            log_event_operation("sign", Some(event_id), Some(kind), "failed", Some(&error.to_string()));
        }
    }
}

fn record_publish_result(monitor: &EventMonitor, event_id: &str, kind: u32, result: &PublishResult) {
    if result.success {
        monitor.track_event(event_id, EventStatus::published(result.published_to.clone()));
        log_event_operation("publish", Some(event_id), Some(kind), "published", None);
    } else {
        let error = result
            .error
            .clone()
            .unwrap_or_else(|| "publish failed".to_string());
        log_event_operation("publish", Some(event_id), Some(kind), "failed", Some(&error));
        monitor.track_event(event_id, EventStatus::failed(error));
    }
}

/// Queue processor body: sign, then publish, reporting through the monitor
async fn process_queued_event(
    item: QueuedEvent,
    signing: &SigningService,
    publishing: &PublishingService,
    monitor: &EventMonitor,
) -> anyhow::Result<()> {
    let event_id = tracking_id(&item.event);
    let kind = item.event.kind;

    let outcome = signing.sign(&item.event, &item.options.signing).await;
    record_signing_outcome(monitor, &event_id, kind, &outcome);
    let signed = match outcome {
        SigningOutcome::Signed { event, .. } => event,
        SigningOutcome::NeedsPassword { error } => {
            // Nobody is around to type a password in the background
            monitor.track_event(&event_id, EventStatus::failed(error.to_string()));
            warn!(queue_id = %item.id, event_id = %event_id, "Queued event needs a password");
            anyhow::bail!(error);
        }
        SigningOutcome::Failed { error } => anyhow::bail!(error),
    };

    let result = publishing.publish(&signed, &item.options.publishing).await;
    record_publish_result(monitor, &signed.id, kind, &result);
    if result.success {
        Ok(())
    } else {
        anyhow::bail!(PipelineError::publishing(
            result.error.unwrap_or_else(|| "publish failed".to_string())
        ))
    }
}
