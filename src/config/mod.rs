//! # Pipeline Configuration
//!
//! Typed configuration for every stage of the event pipeline. All sections
//! default to the values in [`crate::constants`], so a configuration file only
//! needs to name what it overrides.
//!
//! ## Sources (lowest to highest precedence)
//!
//! 1. Built-in defaults
//! 2. `config/relaycast.{yaml,toml,json}` (or an explicit file)
//! 3. `RELAYCAST__<SECTION>__<KEY>` environment variables
//!
//! ```yaml
//! relays:
//!   default_relays: ["wss://relay.damus.io", "wss://nos.lol"]
//! publishing:
//!   max_retries: 5
//!   timeout_ms: 5000
//! queue:
//!   max_concurrent_processing: 5
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relaycast_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load()?;
//! let relays = &config.config().relays.default_relays;
//! let interval = config.config().queue.processing_interval();
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants::{limits, DEFAULT_RELAYS};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub relays: RelayConfig,
    pub signing: SigningConfig,
    pub publishing: PublishingConfig,
    pub queue: QueueConfig,
    pub validation: ValidationConfig,
}

impl PipelineConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.queue.max_queue_size == 0 {
            return Err(PipelineError::Configuration(
                "queue.max_queue_size must be greater than 0".to_string(),
            ));
        }
        if self.queue.max_concurrent_processing == 0 {
            return Err(PipelineError::Configuration(
                "queue.max_concurrent_processing must be greater than 0".to_string(),
            ));
        }
        if self.queue.processing_interval_ms == 0 {
            return Err(PipelineError::Configuration(
                "queue.processing_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.publishing.backoff_factor == 0 {
            return Err(PipelineError::Configuration(
                "publishing.backoff_factor must be at least 1".to_string(),
            ));
        }
        if self.publishing.timeout_ms == 0 {
            return Err(PipelineError::Configuration(
                "publishing.timeout_ms must be greater than 0".to_string(),
            ));
        }
        for relay in &self.relays.default_relays {
            if !(relay.starts_with("wss://") || relay.starts_with("ws://")) {
                return Err(PipelineError::Configuration(format!(
                    "relay address must use ws:// or wss://: {relay}"
                )));
            }
        }
        Ok(())
    }
}

/// Delivery targets
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Process-wide relay list used when a publish call names none
    pub default_relays: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_relays: DEFAULT_RELAYS.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    pub max_retries: u32,
    pub agent_probe_timeout_ms: u64,
    pub agent_sign_timeout_ms: u64,
}

impl SigningConfig {
    pub fn agent_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_probe_timeout_ms)
    }

    pub fn agent_sign_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_sign_timeout_ms)
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            max_retries: limits::MAX_SIGNING_RETRIES,
            agent_probe_timeout_ms: limits::AGENT_PROBE_TIMEOUT_MS,
            agent_sign_timeout_ms: limits::AGENT_SIGN_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishingConfig {
    pub max_retries: u32,
    /// Timeout of the first attempt
    pub timeout_ms: u64,
    pub backoff_factor: u32,
    pub retry_base_delay_ms: u64,
}

impl PublishingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            max_retries: limits::MAX_PUBLISHING_RETRIES,
            timeout_ms: limits::DEFAULT_PUBLISH_TIMEOUT_MS,
            backoff_factor: limits::RETRY_BACKOFF_FACTOR,
            retry_base_delay_ms: limits::RETRY_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_queue_size: usize,
    pub max_concurrent_processing: usize,
    pub processing_interval_ms: u64,
    pub abandonment_window_ms: u64,
}

impl QueueConfig {
    pub fn processing_interval(&self) -> Duration {
        Duration::from_millis(self.processing_interval_ms)
    }

    pub fn abandonment_window(&self) -> Duration {
        Duration::from_millis(self.abandonment_window_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: limits::MAX_QUEUE_SIZE,
            max_concurrent_processing: limits::MAX_CONCURRENT_PROCESSING,
            processing_interval_ms: limits::DEFAULT_QUEUE_PROCESSING_INTERVAL_MS,
            abandonment_window_ms: limits::QUEUE_ABANDONMENT_WINDOW_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_future_skew_seconds: i64,
    pub max_text_note_length: usize,
    pub max_long_form_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_future_skew_seconds: limits::MAX_FUTURE_SKEW_SECONDS,
            max_text_note_length: limits::MAX_TEXT_NOTE_LENGTH,
            max_long_form_length: limits::MAX_LONG_FORM_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.signing.max_retries, 3);
        assert_eq!(config.publishing.max_retries, 5);
        assert_eq!(config.publishing.backoff_factor, 2);
        assert_eq!(config.queue.max_queue_size, 100);
        assert_eq!(config.queue.max_concurrent_processing, 5);
        assert_eq!(config.queue.processing_interval(), Duration::from_millis(100));
        assert_eq!(config.validation.max_future_skew_seconds, 60);
        assert!(!config.relays.default_relays.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = PipelineConfig::default();
        config.queue.max_concurrent_processing = 0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_http_relays() {
        let mut config = PipelineConfig::default();
        config.relays.default_relays = vec!["https://relay.example.com".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"queue": {"max_queue_size": 7}}"#).unwrap();
        assert_eq!(config.queue.max_queue_size, 7);
        assert_eq!(config.queue.max_concurrent_processing, 5);
        assert_eq!(config.publishing, PublishingConfig::default());
    }
}
