//! # Orchestration
//!
//! Coordination on top of the stateless services:
//!
//! - [`queue_manager`] - bounded priority queue with a concurrency-capped scheduler
//! - [`event_monitor`] - lifecycle records, metrics and status broadcasts
//! - [`event_manager`] - the coordinator exposing the public pipeline surface

pub mod event_manager;
pub mod event_monitor;
pub mod queue_manager;

pub use event_manager::{EventManager, EventManagerBuilder, SubmissionOutcome, SIGN_AND_PUBLISH_PROCESSOR};
pub use event_monitor::EventMonitor;
pub use queue_manager::{processor, EventProcessor, QueueManager, QueueStatus};
