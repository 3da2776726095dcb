//! Queue item model.

use crate::constants::{Priority, QueueItemStatus};
use crate::models::event::UnsignedEvent;
use crate::services::publishing::PublishOptions;
use crate::services::signing::SigningOptions;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Options carried with a queued event so the processor can sign and
/// publish it later without the caller's involvement
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub priority: Priority,
    /// Sign synchronously and return without publishing or queueing
    pub skip_publish: bool,
    pub signing: SigningOptions,
    pub publishing: PublishOptions,
}

/// An event waiting in (or being processed by) the queue
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    /// Queue identifier, distinct from the event's content address
    pub id: String,
    pub event: UnsignedEvent,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub status: QueueItemStatus,
    pub options: SubmitOptions,
    /// Monotonic arrival counter breaking ties within a priority class
    pub(crate) sequence: u64,
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl QueuedEvent {
    pub(crate) fn new(
        event: UnsignedEvent,
        priority: Priority,
        options: SubmitOptions,
        sequence: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event,
            priority,
            created_at: Utc::now(),
            status: QueueItemStatus::Queued,
            options,
            sequence,
            started_at: None,
        }
    }

    /// Dequeue ordering key: priority class, then arrival
    pub(crate) fn sort_key(&self) -> (u8, DateTime<Utc>, u64) {
        (self.priority.rank(), self.created_at, self.sequence)
    }
}
