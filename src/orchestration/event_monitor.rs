//! # Event Monitor
//!
//! Per-event lifecycle records plus aggregate metrics. Every recorded
//! transition is also broadcast to subscribers through the
//! [`StatusPublisher`].
//!
//! Metrics are derived, not stored: `publish_success_rate` and
//! `average_processing_time` are recomputed from the raw counters on read.

use crate::constants::LifecycleStatus;
use crate::events::StatusPublisher;
use crate::models::{EventMetrics, EventStatus, StatusChange};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    successful: u64,
    failed: u64,
    processing_times_ms: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct EventMonitor {
    statuses: DashMap<String, EventStatus>,
    /// Ids whose lifecycle began with a `Created` record
    created: DashSet<String>,
    counters: Mutex<Counters>,
    publisher: StatusPublisher,
}

impl EventMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_publisher(publisher: StatusPublisher) -> Self {
        Self {
            publisher,
            ..Self::default()
        }
    }

    /// Record a transition for `event_id`.
    ///
    /// A non-`Created` record keeps the `created_at` of the record it
    /// replaces so processing time spans the whole lifecycle. Processing
    /// time is only sampled for ids that were tracked as `Created`.
    pub fn track_event(&self, event_id: &str, status: EventStatus) {
        let mut status = status;
        status.updated_at = Utc::now();

        let previous = match self.statuses.entry(event_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let previous = entry.get().clone();
                if status.status != LifecycleStatus::Created {
                    status.created_at = previous.created_at;
                }
                entry.insert(status.clone());
                Some(previous)
            }
            Entry::Vacant(entry) => {
                entry.insert(status.clone());
                None
            }
        };

        if status.status == LifecycleStatus::Created {
            self.created.insert(event_id.to_string());
        }

        {
            let mut counters = self.counters.lock();
            match status.status {
                LifecycleStatus::Created => counters.total += 1,
                LifecycleStatus::Published => {
                    counters.successful += 1;
                    if self.created.contains(event_id) {
                        counters.processing_times_ms.push(status.elapsed_ms() as f64);
                    }
                }
                LifecycleStatus::Failed => counters.failed += 1,
                LifecycleStatus::Validated | LifecycleStatus::Queued | LifecycleStatus::Signed => {}
            }
        }

        debug!(
            event_id,
            status = status.status.as_str(),
            previous = previous.as_ref().map(|p| p.status.as_str()),
            "Event status tracked"
        );
        self.publisher.publish(StatusChange {
            event_id: event_id.to_string(),
            previous: previous.map(|p| p.status),
            status,
        });
    }

    /// Move the record for `from` to `to`, used when signing assigns an id
    /// that differs from the one the event was tracked under.
    pub fn rekey(&self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if let Some((_, status)) = self.statuses.remove(from) {
            self.statuses.insert(to.to_string(), status);
            if self.created.remove(from).is_some() {
                self.created.insert(to.to_string());
            }
            debug!(from, to, "Event status re-keyed");
        }
    }

    pub fn get_status(&self, event_id: &str) -> Option<EventStatus> {
        self.statuses.get(event_id).map(|s| s.clone())
    }

    /// The record for one id, or every record ordered by last update
    pub fn get_event_history(&self, event_id: Option<&str>) -> Vec<(String, EventStatus)> {
        match event_id {
            Some(id) => self
                .get_status(id)
                .map(|s| vec![(id.to_string(), s)])
                .unwrap_or_default(),
            None => {
                let mut all: Vec<_> = self
                    .statuses
                    .iter()
                    .map(|e| (e.key().clone(), e.value().clone()))
                    .collect();
                all.sort_by_key(|(_, s)| s.updated_at);
                all
            }
        }
    }

    pub fn get_metrics(&self) -> EventMetrics {
        let counters = self.counters.lock();
        let average_processing_time = if counters.processing_times_ms.is_empty() {
            0.0
        } else {
            counters.processing_times_ms.iter().sum::<f64>()
                / counters.processing_times_ms.len() as f64
        };
        let publish_success_rate = if counters.total == 0 {
            0.0
        } else {
            counters.successful as f64 / counters.total as f64
        };
        EventMetrics {
            total_events: counters.total,
            successful_events: counters.successful,
            failed_events: counters.failed,
            average_processing_time,
            publish_success_rate,
        }
    }

    pub fn clear_history(&self) {
        self.statuses.clear();
        self.created.clear();
    }

    pub fn reset_metrics(&self) {
        *self.counters.lock() = Counters::default();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.publisher.subscribe()
    }

    pub fn tracked_count(&self) -> usize {
        self.statuses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_start_at_zero() {
        let monitor = EventMonitor::new();
        let metrics = monitor.get_metrics();
        assert_eq!(metrics, EventMetrics::default());
    }

    #[test]
    fn test_lifecycle_counts_and_rate() {
        let monitor = EventMonitor::new();
        monitor.track_event("a", EventStatus::new(LifecycleStatus::Created));
        monitor.track_event("b", EventStatus::new(LifecycleStatus::Created));
        monitor.track_event("a", EventStatus::new(LifecycleStatus::Validated));
        monitor.track_event("a", EventStatus::published(vec!["wss://r".into()]));
        monitor.track_event("b", EventStatus::failed("nope"));

        let metrics = monitor.get_metrics();
        assert_eq!(metrics.total_events, 2);
        assert_eq!(metrics.successful_events, 1);
        assert_eq!(metrics.failed_events, 1);
        assert!((metrics.publish_success_rate - 0.5).abs() < f64::EPSILON);
        assert!(metrics.average_processing_time >= 0.0);
    }

    #[test]
    fn test_later_records_keep_creation_time() {
        let monitor = EventMonitor::new();
        monitor.track_event("a", EventStatus::new(LifecycleStatus::Created));
        let created = monitor.get_status("a").unwrap().created_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        monitor.track_event("a", EventStatus::new(LifecycleStatus::Signed));

        let status = monitor.get_status("a").unwrap();
        assert_eq!(status.status, LifecycleStatus::Signed);
        assert_eq!(status.created_at, created);
        assert!(status.updated_at > created);
    }

    #[test]
    fn test_published_without_prior_record_has_no_processing_time() {
        let monitor = EventMonitor::new();
        monitor.track_event("x", EventStatus::published(vec![]));
        let metrics = monitor.get_metrics();
        assert_eq!(metrics.successful_events, 1);
        assert_eq!(metrics.average_processing_time, 0.0);
        assert_eq!(metrics.publish_success_rate, 0.0);
    }

    #[test]
    fn test_only_created_lifecycles_sample_processing_time() {
        let monitor = EventMonitor::new();
        monitor.track_event("draft", EventStatus::new(LifecycleStatus::Validated));
        std::thread::sleep(std::time::Duration::from_millis(20));
        monitor.track_event("draft", EventStatus::published(vec!["wss://r".into()]));

        let metrics = monitor.get_metrics();
        assert_eq!(metrics.total_events, 0);
        assert_eq!(metrics.successful_events, 1);
        assert_eq!(metrics.average_processing_time, 0.0);

        monitor.track_event("made", EventStatus::new(LifecycleStatus::Created));
        std::thread::sleep(std::time::Duration::from_millis(20));
        monitor.track_event("made", EventStatus::published(vec!["wss://r".into()]));
        assert!(monitor.get_metrics().average_processing_time >= 20.0);
    }

    #[test]
    fn test_rekey_carries_created_marker() {
        let monitor = EventMonitor::new();
        monitor.track_event("draft-id", EventStatus::new(LifecycleStatus::Created));
        std::thread::sleep(std::time::Duration::from_millis(5));
        monitor.rekey("draft-id", "signed-id");
        monitor.track_event("signed-id", EventStatus::published(vec![]));
        assert!(monitor.get_metrics().average_processing_time >= 5.0);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let monitor = EventMonitor::new();
        let mut rx = monitor.subscribe();
        monitor.track_event("a", EventStatus::new(LifecycleStatus::Created));
        monitor.track_event("a", EventStatus::new(LifecycleStatus::Queued));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.previous, None);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.previous, Some(LifecycleStatus::Created));
        assert_eq!(second.status.status, LifecycleStatus::Queued);
    }

    #[test]
    fn test_rekey_moves_record() {
        let monitor = EventMonitor::new();
        monitor.track_event("old", EventStatus::new(LifecycleStatus::Validated));
        monitor.rekey("old", "new");
        assert!(monitor.get_status("old").is_none());
        assert_eq!(
            monitor.get_status("new").unwrap().status,
            LifecycleStatus::Validated
        );
    }

    #[test]
    fn test_clear_and_reset() {
        let monitor = EventMonitor::new();
        monitor.track_event("a", EventStatus::new(LifecycleStatus::Created));
        monitor.clear_history();
        assert_eq!(monitor.tracked_count(), 0);
        assert_eq!(monitor.get_metrics().total_events, 1);
        monitor.reset_metrics();
        assert_eq!(monitor.get_metrics().total_events, 0);
    }
}
