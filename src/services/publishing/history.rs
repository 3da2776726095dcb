//! Append-only publish history keyed by event id.

use crate::models::{Event, PublishHistoryEntry, PublishResult};
use chrono::Utc;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct PublishHistory {
    entries: DashMap<String, Vec<PublishHistoryEntry>>,
}

impl PublishHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: &Event, result: &PublishResult) {
        self.entries
            .entry(event.id.clone())
            .or_default()
            .push(PublishHistoryEntry {
                event: event.clone(),
                result: result.clone(),
                timestamp: Utc::now(),
            });
    }

    pub fn latest(&self, event_id: &str) -> Option<PublishHistoryEntry> {
        self.entries
            .get(event_id)
            .and_then(|entries| entries.last().cloned())
    }

    /// Every recorded entry for `event_id`, oldest first
    pub fn entries_for(&self, event_id: &str) -> Vec<PublishHistoryEntry> {
        self.entries
            .get(event_id)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
