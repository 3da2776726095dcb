//! Publication results and history records.

use crate::models::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single transport attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishAttempt {
    /// Zero-based attempt index; attempt 0 is the initial try
    pub attempt: u32,
    pub timeout_ms: u64,
    pub acknowledged: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    /// At least one relay acknowledged
    pub success: bool,
    pub published_to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<PublishAttempt>,
}

impl PublishResult {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

/// Append-only history record keyed by `Event::id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishHistoryEntry {
    pub event: Event,
    pub result: PublishResult,
    pub timestamp: DateTime<Utc>,
}
