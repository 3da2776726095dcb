//! # Event Signing
//!
//! [`SigningService`] holds an ordered list of [`SigningMethod`] strategies and
//! delegates to the first one whose `can_sign` succeeds. The default order is:
//!
//! 1. [`AgentSigningMethod`] - an external interactive signer
//! 2. [`PrivateKeySigningMethod`] - a raw key passed in the options
//! 3. [`EncryptedKeySigningMethod`] - a password-protected local key
//!
//! Expected failures come back as a [`SigningOutcome`] variant, never as a
//! panic or an `Err`. `NeedsPassword` is the only outcome that needs a human
//! before a retry can succeed.

pub mod crypto;
pub mod methods;

use crate::config::SigningConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Event, UnsignedEvent};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub use methods::{
    AgentSigningMethod, EncryptedKeySigningMethod, KeyUnlocker, PrivateKeySigningMethod,
    SigningAgent,
};

/// Credentials for a single signing run
#[derive(Clone, Default)]
pub struct SigningOptions {
    /// Hex secret key
    pub private_key: Option<String>,
    /// Password for the encrypted local key
    pub password: Option<String>,
}

impl SigningOptions {
    pub fn with_private_key(private_key: impl Into<String>) -> Self {
        Self {
            private_key: Some(private_key.into()),
            password: None,
        }
    }

    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            private_key: None,
            password: Some(password.into()),
        }
    }
}

impl fmt::Debug for SigningOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SigningOptions")
            .field("private_key", &redact(&self.private_key))
            .field("password", &redact(&self.password))
            .finish()
    }
}

/// Failure of a single signing attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    #[error("No signing method available")]
    NoMethod,

    #[error("Password required to unlock the signing key")]
    NeedsPassword,

    /// Bad password or malformed key; retrying with the same input cannot help
    #[error("{0}")]
    Credential(String),

    /// Unexpected failure; the whole signing run is retried
    #[error("{0}")]
    Internal(String),
}

/// A way of turning an unsigned event into a signed one
#[async_trait]
pub trait SigningMethod: Send + Sync {
    fn name(&self) -> &'static str;

    async fn can_sign(&self, event: &UnsignedEvent, options: &SigningOptions) -> bool;

    async fn sign(&self, event: &UnsignedEvent, options: &SigningOptions) -> std::result::Result<Event, SignError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SigningOutcome {
    Signed { event: Event, method: &'static str },
    Failed { error: PipelineError },
    /// An encrypted key exists but no password was supplied
    NeedsPassword { error: PipelineError },
}

impl SigningOutcome {
    pub fn is_signed(&self) -> bool {
        matches!(self, SigningOutcome::Signed { .. })
    }

    pub fn needs_password(&self) -> bool {
        matches!(self, SigningOutcome::NeedsPassword { .. })
    }

    pub fn event(&self) -> Option<&Event> {
        match self {
            SigningOutcome::Signed { event, .. } => Some(event),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            SigningOutcome::Signed { .. } => None,
            SigningOutcome::Failed { error } | SigningOutcome::NeedsPassword { error } => {
                Some(error)
            }
        }
    }

    pub(crate) fn failed(error: PipelineError) -> Self {
        SigningOutcome::Failed { error }
    }
}

pub struct SigningService {
    methods: Vec<Arc<dyn SigningMethod>>,
    agent: Option<Arc<dyn SigningAgent>>,
    unlocker: Option<Arc<dyn KeyUnlocker>>,
    config: SigningConfig,
}

impl fmt::Debug for SigningService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningService")
            .field("methods", &self.method_names())
            .field("config", &self.config)
            .finish()
    }
}

impl SigningService {
    /// Default method order built from whichever collaborators are present
    pub fn new(
        config: SigningConfig,
        agent: Option<Arc<dyn SigningAgent>>,
        unlocker: Option<Arc<dyn KeyUnlocker>>,
    ) -> Self {
        let mut methods: Vec<Arc<dyn SigningMethod>> = Vec::new();
        if let Some(agent) = &agent {
            methods.push(Arc::new(AgentSigningMethod::new(
                Arc::clone(agent),
                config.agent_probe_timeout(),
                config.agent_sign_timeout(),
            )));
        }
        methods.push(Arc::new(PrivateKeySigningMethod));
        if let Some(unlocker) = &unlocker {
            methods.push(Arc::new(EncryptedKeySigningMethod::new(Arc::clone(unlocker))));
        }

        Self {
            methods,
            agent,
            unlocker,
            config,
        }
    }

    /// Replace the method list while keeping public-key resolution
    pub fn with_methods(mut self, methods: Vec<Arc<dyn SigningMethod>>) -> Self {
        self.methods = methods;
        self
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    /// Resolve the local identity: the agent first (bounded by the probe
    /// timeout), then the public key stored with the encrypted key.
    pub async fn get_public_key(&self) -> Result<String> {
        if let Some(agent) = &self.agent {
            if let Some(pubkey) =
                methods::probe_agent(agent.as_ref(), self.config.agent_probe_timeout()).await
            {
                return Ok(pubkey);
            }
        }
        if let Some(pubkey) = self.unlocker.as_ref().and_then(|u| u.public_key()) {
            return Ok(pubkey);
        }
        Err(PipelineError::signing("No public key available: signing agent unreachable and no stored key"))
    }

    /// Sign with the first applicable method.
    ///
    /// Internal errors restart the whole run up to `max_retries` more times.
    #[instrument(skip(self, event, options), fields(kind = event.kind))]
    pub async fn sign(&self, event: &UnsignedEvent, options: &SigningOptions) -> SigningOutcome {
        let max_retries = self.config.max_retries;
        let mut last_error = String::new();

        for attempt in 0..=max_retries {
            match self.try_sign(event, options).await {
                Ok((signed, method)) => {
                    info!(event_id = %signed.id, method, attempt, "Event signed");
                    return SigningOutcome::Signed {
                        event: signed,
                        method,
                    };
                }
                Err(SignError::NeedsPassword) => {
                    debug!("Encrypted key requires a password");
                    return SigningOutcome::NeedsPassword {
                        error: PipelineError::SigningFailed {
                            message: SignError::NeedsPassword.to_string(),
                            needs_password: true,
                        },
                    };
                }
                Err(err @ (SignError::NoMethod | SignError::Credential(_))) => {
                    warn!(error = %err, "Signing failed");
                    return SigningOutcome::failed(PipelineError::signing(err.to_string()));
                }
                Err(SignError::Internal(message)) => {
                    warn!(attempt, max_retries, error = %message, "Signing attempt failed");
                    last_error = message;
                }
            }
        }

        SigningOutcome::failed(PipelineError::signing(format!(
            "signing failed after {} attempts: {last_error}",
            max_retries + 1
        )))
    }

    async fn try_sign(
        &self,
        event: &UnsignedEvent,
        options: &SigningOptions,
    ) -> std::result::Result<(Event, &'static str), SignError> {
        for method in &self.methods {
            if method.can_sign(event, options).await {
                debug!(method = method.name(), "Using signing method");
                let signed = method.sign(event, options).await?;
                return Ok((signed, method.name()));
            }
        }
        Err(SignError::NoMethod)
    }
}
