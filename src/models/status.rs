//! Lifecycle status records and derived metrics.

use crate::constants::LifecycleStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current lifecycle record for one event id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStatus {
    pub status: LifecycleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_to: Option<Vec<String>>,
}

impl EventStatus {
    pub fn new(status: LifecycleStatus) -> Self {
        let now = Utc::now();
        Self {
            status,
            created_at: now,
            updated_at: now,
            error: None,
            published_to: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(LifecycleStatus::Failed)
        }
    }

    pub fn published(published_to: Vec<String>) -> Self {
        Self {
            published_to: Some(published_to),
            ..Self::new(LifecycleStatus::Published)
        }
    }

    /// Time from creation to the latest update in milliseconds
    pub fn elapsed_ms(&self) -> i64 {
        (self.updated_at - self.created_at).num_milliseconds()
    }
}

/// Aggregate pipeline metrics, recomputed on every read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetrics {
    pub total_events: u64,
    pub successful_events: u64,
    pub failed_events: u64,
    /// Mean created→published time in milliseconds
    pub average_processing_time: f64,
    /// `successful_events / total_events`, 0 when nothing was created yet
    pub publish_success_rate: f64,
}

/// Broadcast record of a single status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub event_id: String,
    pub previous: Option<LifecycleStatus>,
    pub status: EventStatus,
}
