//! In-memory stand-ins for the pipeline's injected collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use relaycast_core::models::{Event, UnsignedEvent};
use relaycast_core::services::signing::crypto;
use relaycast_core::services::{KeyUnlocker, RelayTransport, SigningAgent};
use secp256k1::SecretKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// How [`MockTransport`] answers a publish call
#[derive(Debug, Clone)]
pub enum TransportMode {
    /// Every relay acknowledges
    AckAll,
    /// Only the listed relays acknowledge
    AckOnly(Vec<String>),
    /// No relay acknowledges
    NeverAck,
    /// The transport itself errors
    Fail(String),
    /// Never completes
    Hang,
    /// Fails until the given (1-based) call, then acknowledges everything
    SucceedOnCall(usize),
    /// Waits for [`MockTransport::release`], then acknowledges everything
    Gated,
}

pub struct MockTransport {
    mode: Mutex<TransportMode>,
    calls: AtomicUsize,
    published: Mutex<Vec<Event>>,
    gate: Notify,
}

impl MockTransport {
    pub fn new(mode: TransportMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            gate: Notify::new(),
        })
    }

    pub fn ack_all() -> Arc<Self> {
        Self::new(TransportMode::AckAll)
    }

    pub fn never_ack() -> Arc<Self> {
        Self::new(TransportMode::NeverAck)
    }

    pub fn set_mode(&self, mode: TransportMode) {
        *self.mode.lock() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Events passed to the transport, in call order
    pub fn published(&self) -> Vec<Event> {
        self.published.lock().clone()
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl RelayTransport for MockTransport {
    async fn publish_to_relays(&self, event: &Event, relays: &[String]) -> anyhow::Result<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.published.lock().push(event.clone());
        let mode = self.mode.lock().clone();
        match mode {
            TransportMode::AckAll => Ok(relays.to_vec()),
            TransportMode::AckOnly(acked) => Ok(relays
                .iter()
                .filter(|r| acked.contains(r))
                .cloned()
                .collect()),
            TransportMode::NeverAck => Ok(Vec::new()),
            TransportMode::Fail(message) => Err(anyhow::anyhow!(message)),
            TransportMode::Hang => std::future::pending().await,
            TransportMode::SucceedOnCall(n) if call >= n => Ok(relays.to_vec()),
            TransportMode::SucceedOnCall(_) => Err(anyhow::anyhow!("connection refused")),
            TransportMode::Gated => {
                self.gate.notified().await;
                Ok(relays.to_vec())
            }
        }
    }
}

/// External signer holding its own key
pub struct MockAgent {
    secret_key: Option<SecretKey>,
    hang: bool,
    sign_calls: AtomicUsize,
}

impl MockAgent {
    pub fn with_key(secret_key: SecretKey) -> Arc<Self> {
        Arc::new(Self {
            secret_key: Some(secret_key),
            hang: false,
            sign_calls: AtomicUsize::new(0),
        })
    }

    /// Agent whose every call errors
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            secret_key: None,
            hang: false,
            sign_calls: AtomicUsize::new(0),
        })
    }

    /// Agent that never answers
    pub fn unresponsive() -> Arc<Self> {
        Arc::new(Self {
            secret_key: None,
            hang: true,
            sign_calls: AtomicUsize::new(0),
        })
    }

    pub fn public_key(&self) -> Option<String> {
        self.secret_key.as_ref().map(crypto::public_key_hex)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SigningAgent for MockAgent {
    async fn get_public_key(&self) -> anyhow::Result<String> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.public_key()
            .ok_or_else(|| anyhow::anyhow!("signing agent not installed"))
    }

    async fn sign_event(&self, event: UnsignedEvent) -> anyhow::Result<Event> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        let secret_key = self
            .secret_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("signing agent not installed"))?;
        Ok(crypto::sign_event(&event, secret_key)?)
    }
}

/// Password-protected local key
pub struct MockUnlocker {
    secret_key: SecretKey,
    password: String,
}

impl MockUnlocker {
    pub fn new(secret_key: SecretKey, password: &str) -> Arc<Self> {
        Arc::new(Self {
            secret_key,
            password: password.to_string(),
        })
    }
}

#[async_trait]
impl KeyUnlocker for MockUnlocker {
    fn has_encrypted_key(&self) -> bool {
        true
    }

    fn public_key(&self) -> Option<String> {
        Some(crypto::public_key_hex(&self.secret_key))
    }

    async fn unlock(&self, password: &str) -> anyhow::Result<SecretKey> {
        if password == self.password {
            Ok(self.secret_key)
        } else {
            anyhow::bail!("wrong password")
        }
    }
}
