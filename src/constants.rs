//! # System Constants
//!
//! Tunables, well-known event kinds and the shared enums that define the
//! operational boundaries of the event pipeline. Every numeric tunable here is
//! the default for the matching field in [`crate::config::PipelineConfig`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Retry, timeout and capacity limits
pub mod limits {
    /// Extra attempts of a whole signing run after an unexpected internal error
    pub const MAX_SIGNING_RETRIES: u32 = 3;

    /// Extra publication attempts after the first one acknowledged nowhere
    pub const MAX_PUBLISHING_RETRIES: u32 = 5;

    /// Multiplier applied to both the publish timeout and the backoff delay
    pub const RETRY_BACKOFF_FACTOR: u32 = 2;

    /// Delay before the first publish retry; later retries scale by the factor
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// Timeout of the first publish attempt
    pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 5000;

    /// How long `canSign`/`getPublicKey` wait for the external signing agent
    pub const AGENT_PROBE_TIMEOUT_MS: u64 = 2000;

    /// How long the external signing agent may take to return a signed event
    pub const AGENT_SIGN_TIMEOUT_MS: u64 = 30_000;

    /// Pending items accepted before `enqueue` rejects
    pub const MAX_QUEUE_SIZE: usize = 100;

    /// Items handed to processors at the same time
    pub const MAX_CONCURRENT_PROCESSING: usize = 5;

    /// Scheduler tick interval
    pub const DEFAULT_QUEUE_PROCESSING_INTERVAL_MS: u64 = 100;

    /// In-flight items older than this are dropped from the in-flight set
    pub const QUEUE_ABANDONMENT_WINDOW_MS: u64 = 300_000;

    /// How far `created_at` may run ahead of the local clock
    pub const MAX_FUTURE_SKEW_SECONDS: i64 = 60;

    /// Character cap for short text content (notes, comments)
    pub const MAX_TEXT_NOTE_LENGTH: usize = 10_000;

    /// Character cap for long-form articles
    pub const MAX_LONG_FORM_LENGTH: usize = 100_000;

    /// Capacity of the status-change broadcast channel
    pub const STATUS_CHANNEL_CAPACITY: usize = 1000;
}

/// Well-known event kinds with built-in content rules
pub mod kinds {
    pub const METADATA: u32 = 0;
    pub const TEXT_NOTE: u32 = 1;
    pub const REPOST: u32 = 6;
    pub const REACTION: u32 = 7;
    pub const POLL: u32 = 1068;
    pub const COMMENT: u32 = 1111;
    pub const COMMUNITY_APPROVAL: u32 = 4550;
    pub const LONG_FORM_ARTICLE: u32 = 30023;
    pub const COMMUNITY_DEFINITION: u32 = 34550;

    /// Largest kind number the protocol allows
    pub const MAX_KIND: u32 = 65_535;
}

/// Relay endpoints used when a publish call does not name its own
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];

/// Content values accepted for reaction events
pub const REACTION_CONTENT_VALUES: &[&str] = &["+", "-"];

/// Scheduling class controlling queue dequeue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Sort rank: lower ranks are dequeued first
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single event through the pipeline
///
/// `Created → Validated → Queued → Signed → Published`, or `Failed` from any
/// step after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Created,
    Validated,
    Queued,
    Signed,
    Published,
    Failed,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Created => "created",
            LifecycleStatus::Validated => "validated",
            LifecycleStatus::Queued => "queued",
            LifecycleStatus::Signed => "signed",
            LifecycleStatus::Published => "published",
            LifecycleStatus::Failed => "failed",
        }
    }

    /// No further transitions are expected from a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleStatus::Published | LifecycleStatus::Failed)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of an item owned by the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}
