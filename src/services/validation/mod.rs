//! # Event Validation
//!
//! Runs an ordered list of [`EventValidator`]s against an unsigned event and
//! aggregates every field-level problem into one error. Validators never
//! short-circuit each other, so a caller sees all problems at once.
//!
//! ```rust
//! use relaycast_core::services::validation::ValidationService;
//! use relaycast_core::models::UnsignedEvent;
//!
//! let service = ValidationService::default();
//! let event = UnsignedEvent {
//!     kind: 1,
//!     created_at: chrono::Utc::now().timestamp(),
//!     tags: vec![],
//!     content: "hello".to_string(),
//!     pubkey: "a".repeat(64),
//! };
//! assert!(service.validate(&event).is_ok());
//! ```

pub mod content;
pub mod structural;

use crate::config::ValidationConfig;
use crate::error::{FieldError, PipelineError, Result};
use crate::models::UnsignedEvent;
use chrono::Utc;
use tracing::debug;

pub use content::{ContentValidator, KindRule};
pub use structural::StructuralValidator;

/// A single independent check over an unsigned event
pub trait EventValidator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Append problems found in `event` to `errors`. `now` is the unix time
    /// the whole validation run uses.
    fn check(&self, event: &UnsignedEvent, now: i64, errors: &mut Vec<FieldError>);
}

/// Outcome of a validation run that found no problems
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub validators_run: Vec<&'static str>,
}

pub struct ValidationService {
    validators: Vec<Box<dyn EventValidator>>,
}

impl std::fmt::Debug for ValidationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationService")
            .field(
                "validators",
                &self.validators.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ValidationService {
    /// Structural checks followed by the built-in content-by-kind rules
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            validators: vec![
                Box::new(StructuralValidator::new(config.max_future_skew_seconds)),
                Box::new(ContentValidator::with_builtin_rules(config)),
            ],
        }
    }

    pub fn with_validators(validators: Vec<Box<dyn EventValidator>>) -> Self {
        Self { validators }
    }

    pub fn add_validator(&mut self, validator: Box<dyn EventValidator>) {
        self.validators.push(validator);
    }

    /// Collect every problem without failing
    pub fn collect_errors(&self, event: &UnsignedEvent) -> Vec<FieldError> {
        let now = Utc::now().timestamp();
        let mut errors = Vec::new();
        for validator in &self.validators {
            validator.check(event, now, &mut errors);
        }
        errors
    }

    /// Fails with [`PipelineError::ValidationFailed`] listing every problem.
    /// Never mutates `event`.
    pub fn validate(&self, event: &UnsignedEvent) -> Result<ValidationResult> {
        let errors = self.collect_errors(event);
        if !errors.is_empty() {
            debug!(
                kind = event.kind,
                error_count = errors.len(),
                "Event validation failed"
            );
            return Err(PipelineError::ValidationFailed { errors });
        }
        Ok(ValidationResult {
            validators_run: self.validators.iter().map(|v| v.name()).collect(),
        })
    }
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}
