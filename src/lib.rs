#![allow(clippy::doc_markdown)] // Allow technical terms like secp256k1, BIP-340 in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Relaycast Core
//!
//! Asynchronous pipeline that takes a user-authored message from draft to
//! broadcast on a decentralized relay network.
//!
//! ## Overview
//!
//! Every event passes through the same stages:
//!
//! 1. **Validation** - structural checks plus per-kind content rules
//! 2. **Signing** - content-addressed id and BIP-340 Schnorr signature, via an
//!    external agent, a raw key, or a password-protected key
//! 3. **Publishing** - transmission to relays with timeouts and exponential backoff
//!
//! Submissions can run synchronously or through a bounded priority queue with
//! a concurrency-capped background scheduler. An event monitor records each
//! lifecycle transition and derives success metrics.
//!
//! ## Module Organization
//!
//! - [`models`] - events, tags, queue items, status and publish records
//! - [`services`] - validation, signing and publishing stages
//! - [`orchestration`] - queue manager, event monitor and the [`EventManager`] coordinator
//! - [`config`] - layered configuration
//! - [`constants`] - tunables, well-known kinds and lifecycle enums
//! - [`error`] - structured error handling
//! - [`events`] - broadcast of status transitions
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relaycast_core::config::ConfigManager;
//! use relaycast_core::models::SubmitOptions;
//! use relaycast_core::services::{RelayTransport, SigningAgent};
//! use relaycast_core::EventManager;
//! use std::sync::Arc;
//!
//! # async fn example(transport: Arc<dyn RelayTransport>, agent: Arc<dyn SigningAgent>) -> relaycast_core::Result<()> {
//! relaycast_core::logging::init_structured_logging();
//! let config = ConfigManager::load()?.config().clone();
//!
//! let manager = EventManager::builder()
//!     .config(config)
//!     .signing_agent(agent)
//!     .transport(transport)
//!     .build()?;
//! manager.start();
//!
//! let draft = manager.create_event(1, "hello", vec![]).await?;
//! let outcome = manager.sign_and_publish_event(draft, SubmitOptions::default()).await;
//! println!("submitted: {}", outcome.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod services;

pub use config::{ConfigManager, PipelineConfig};
pub use constants::{LifecycleStatus, Priority, QueueItemStatus};
pub use error::{FieldError, PipelineError, Result};
pub use models::{
    Event, EventMetrics, EventStatus, PublishResult, QueuedEvent, StatusChange, SubmitOptions,
    Tag, UnsignedEvent,
};
pub use orchestration::{EventManager, EventManagerBuilder, QueueStatus, SubmissionOutcome};
pub use services::{
    KeyUnlocker, PublishOptions, RelayTransport, SigningAgent, SigningOptions, SigningOutcome,
};
