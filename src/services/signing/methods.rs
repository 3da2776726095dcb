//! Built-in signing strategies, tried in this order by default:
//! external agent, raw private key, password-protected key.

use super::crypto;
use super::{SignError, SigningMethod, SigningOptions};
use crate::models::{Event, UnsignedEvent};
use async_trait::async_trait;
use secp256k1::SecretKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Interactive signer living outside the process (e.g. a browser extension
/// or remote bunker). It owns the key and computes id and signature itself.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    async fn get_public_key(&self) -> anyhow::Result<String>;

    async fn sign_event(&self, event: UnsignedEvent) -> anyhow::Result<Event>;
}

/// Access to a locally stored, password-encrypted private key
#[async_trait]
pub trait KeyUnlocker: Send + Sync {
    fn has_encrypted_key(&self) -> bool;

    /// Public key stored alongside the encrypted key, if known
    fn public_key(&self) -> Option<String>;

    /// Decrypt the key; fails on a wrong password
    async fn unlock(&self, password: &str) -> anyhow::Result<SecretKey>;
}

/// Probe the agent for its public key within `probe_timeout`
pub(crate) async fn probe_agent(agent: &dyn SigningAgent, probe_timeout: Duration) -> Option<String> {
    match timeout(probe_timeout, agent.get_public_key()).await {
        Ok(Ok(pubkey)) if !pubkey.is_empty() => Some(pubkey),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            debug!(error = %e, "Signing agent unavailable");
            None
        }
        Err(_) => {
            debug!(timeout_ms = probe_timeout.as_millis() as u64, "Signing agent probe timed out");
            None
        }
    }
}

pub struct AgentSigningMethod {
    agent: Arc<dyn SigningAgent>,
    probe_timeout: Duration,
    sign_timeout: Duration,
}

impl AgentSigningMethod {
    pub fn new(agent: Arc<dyn SigningAgent>, probe_timeout: Duration, sign_timeout: Duration) -> Self {
        Self {
            agent,
            probe_timeout,
            sign_timeout,
        }
    }
}

#[async_trait]
impl SigningMethod for AgentSigningMethod {
    fn name(&self) -> &'static str {
        "agent"
    }

    async fn can_sign(&self, _event: &UnsignedEvent, _options: &SigningOptions) -> bool {
        probe_agent(self.agent.as_ref(), self.probe_timeout).await.is_some()
    }

    async fn sign(&self, event: &UnsignedEvent, _options: &SigningOptions) -> Result<Event, SignError> {
        let signed = timeout(self.sign_timeout, self.agent.sign_event(event.clone()))
            .await
            .map_err(|_| {
                SignError::Internal(format!(
                    "signing agent timed out after {}ms",
                    self.sign_timeout.as_millis()
                ))
            })?
            .map_err(|e| SignError::Internal(format!("signing agent error: {e}")))?;

        if signed.id.is_empty() || signed.sig.is_empty() {
            return Err(SignError::Internal(
                "signing agent returned an event without id or signature".to_string(),
            ));
        }
        Ok(signed)
    }
}

/// Signs with a hex private key passed in [`SigningOptions::private_key`]
#[derive(Debug, Default)]
pub struct PrivateKeySigningMethod;

#[async_trait]
impl SigningMethod for PrivateKeySigningMethod {
    fn name(&self) -> &'static str {
        "private_key"
    }

    async fn can_sign(&self, _event: &UnsignedEvent, options: &SigningOptions) -> bool {
        options.private_key.is_some()
    }

    async fn sign(&self, event: &UnsignedEvent, options: &SigningOptions) -> Result<Event, SignError> {
        let secret_hex = options.private_key.as_deref().ok_or(SignError::NoMethod)?;
        let secret_key = crypto::secret_key_from_hex(secret_hex)?;
        crypto::sign_event(event, &secret_key)
    }
}

pub struct EncryptedKeySigningMethod {
    unlocker: Arc<dyn KeyUnlocker>,
}

impl EncryptedKeySigningMethod {
    pub fn new(unlocker: Arc<dyn KeyUnlocker>) -> Self {
        Self { unlocker }
    }
}

#[async_trait]
impl SigningMethod for EncryptedKeySigningMethod {
    fn name(&self) -> &'static str {
        "encrypted_key"
    }

    async fn can_sign(&self, _event: &UnsignedEvent, _options: &SigningOptions) -> bool {
        self.unlocker.has_encrypted_key()
    }

    async fn sign(&self, event: &UnsignedEvent, options: &SigningOptions) -> Result<Event, SignError> {
        let password = options.password.as_deref().ok_or(SignError::NeedsPassword)?;
        let secret_key = self
            .unlocker
            .unlock(password)
            .await
            .map_err(|e| SignError::Credential(format!("failed to unlock key: {e}")))?;
        crypto::sign_event(event, &secret_key)
    }
}
