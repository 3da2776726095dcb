//! # Pipeline Models
//!
//! Data shapes shared by every stage of the pipeline:
//!
//! - [`event`] - unsigned and signed events, tags, canonical hashing
//! - [`queued_event`] - queue items and the options they carry
//! - [`status`] - lifecycle records and derived metrics
//! - [`publish`] - publication results and history

pub mod event;
pub mod publish;
pub mod queued_event;
pub mod status;

pub use event::{Event, Tag, UnsignedEvent};
pub use publish::{PublishAttempt, PublishHistoryEntry, PublishResult};
pub use queued_event::{QueuedEvent, SubmitOptions};
pub use status::{EventMetrics, EventStatus, StatusChange};
