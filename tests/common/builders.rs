//! Test data builders for events, keys and pipeline configuration.

use chrono::Utc;
use relaycast_core::config::PipelineConfig;
use relaycast_core::models::{Tag, UnsignedEvent};
use relaycast_core::services::signing::crypto;
use secp256k1::SecretKey;

pub const SECRET_HEX: &str = "0303030303030303030303030303030303030303030303030303030303030303";
pub const OTHER_SECRET_HEX: &str =
    "0404040404040404040404040404040404040404040404040404040404040404";

pub fn secret_key() -> SecretKey {
    crypto::secret_key_from_hex(SECRET_HEX).unwrap()
}

pub fn other_secret_key() -> SecretKey {
    crypto::secret_key_from_hex(OTHER_SECRET_HEX).unwrap()
}

pub fn public_key() -> String {
    crypto::public_key_hex(&secret_key())
}

/// Builder for unsigned events owned by [`public_key`]
pub struct EventBuilder {
    event: UnsignedEvent,
}

impl EventBuilder {
    pub fn text_note(content: &str) -> Self {
        Self::kind(1).content(content)
    }

    pub fn kind(kind: u32) -> Self {
        Self {
            event: UnsignedEvent {
                kind,
                created_at: Utc::now().timestamp(),
                tags: Vec::new(),
                content: String::new(),
                pubkey: public_key(),
            },
        }
    }

    pub fn content(mut self, content: &str) -> Self {
        self.event.content = content.to_string();
        self
    }

    pub fn tag(mut self, parts: &[&str]) -> Self {
        self.event.tags.push(Tag::new(parts.iter().copied()));
        self
    }

    pub fn pubkey(mut self, pubkey: &str) -> Self {
        self.event.pubkey = pubkey.to_string();
        self
    }

    pub fn created_at(mut self, created_at: i64) -> Self {
        self.event.created_at = created_at;
        self
    }

    pub fn build(self) -> UnsignedEvent {
        self.event
    }
}

/// Configuration tuned for fast tests: short intervals and delays
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.relays.default_relays = vec![
        "wss://relay.one.example".to_string(),
        "wss://relay.two.example".to_string(),
    ];
    config.queue.processing_interval_ms = 10;
    config.publishing.retry_base_delay_ms = 1;
    config.publishing.timeout_ms = 200;
    config
}
