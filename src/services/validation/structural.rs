//! Shape checks that apply to every event regardless of kind.

use super::EventValidator;
use crate::constants::kinds::MAX_KIND;
use crate::error::FieldError;
use crate::models::UnsignedEvent;

#[derive(Debug, Clone)]
pub struct StructuralValidator {
    max_future_skew_seconds: i64,
}

impl StructuralValidator {
    pub fn new(max_future_skew_seconds: i64) -> Self {
        Self {
            max_future_skew_seconds,
        }
    }
}

pub(crate) fn is_hex_key(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

impl EventValidator for StructuralValidator {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn check(&self, event: &UnsignedEvent, now: i64, errors: &mut Vec<FieldError>) {
        if event.kind > MAX_KIND {
            errors.push(FieldError::new(
                "kind",
                format!("must be an integer between 0 and {MAX_KIND}"),
            ));
        }

        if event.created_at < 0 {
            errors.push(FieldError::new("created_at", "must not be negative"));
        } else if event.created_at > now + self.max_future_skew_seconds {
            errors.push(FieldError::new(
                "created_at",
                format!(
                    "must not be more than {}s in the future",
                    self.max_future_skew_seconds
                ),
            ));
        }

        for (index, tag) in event.tags.iter().enumerate() {
            match tag.kind() {
                None => errors.push(FieldError::new(
                    format!("tags[{index}]"),
                    "must not be empty",
                )),
                Some("") => errors.push(FieldError::new(
                    format!("tags[{index}]"),
                    "tag name must not be empty",
                )),
                Some(_) => {}
            }
        }

        if !is_hex_key(&event.pubkey) {
            errors.push(FieldError::new(
                "pubkey",
                "must be 64 hexadecimal characters",
            ));
        }
    }
}
