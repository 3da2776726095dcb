//! # Pipeline Services
//!
//! The three stateless-or-nearly-stateless stages an event passes through
//! before it reaches relays. Each is usable on its own; the
//! [`crate::orchestration::EventManager`] wires them together.

pub mod publishing;
pub mod signing;
pub mod validation;

pub use publishing::{PublishOptions, PublishingService, RelayTransport};
pub use signing::{
    KeyUnlocker, SigningAgent, SigningMethod, SigningOptions, SigningOutcome, SigningService,
};
pub use validation::{EventValidator, ValidationResult, ValidationService};
