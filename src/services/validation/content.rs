//! Kind-specific semantic rules.
//!
//! Rules are registered per kind; kinds with no registered rule pass through.
//! New kinds are supported by calling [`ContentValidator::register`] without
//! touching the existing rules.

use super::EventValidator;
use crate::config::ValidationConfig;
use crate::constants::{kinds, REACTION_CONTENT_VALUES};
use crate::error::FieldError;
use crate::models::UnsignedEvent;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A semantic check for one event kind
pub type KindRule = Arc<dyn Fn(&UnsignedEvent, &mut Vec<FieldError>) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ContentValidator {
    rules: HashMap<u32, Vec<KindRule>>,
}

impl std::fmt::Debug for ContentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<_> = self.rules.keys().copied().collect();
        registered.sort_unstable();
        f.debug_struct("ContentValidator")
            .field("kinds", &registered)
            .finish()
    }
}

impl ContentValidator {
    /// Validator with no rules; every kind passes
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_rules(config: &ValidationConfig) -> Self {
        let mut validator = Self::new();
        let text_limit = config.max_text_note_length;
        let long_form_limit = config.max_long_form_length;

        validator.register(kinds::METADATA, |event, errors| {
            parse_json_object(event, errors);
        });

        validator.register(kinds::TEXT_NOTE, move |event, errors| {
            require_text(event, text_limit, errors);
        });

        validator.register(kinds::REPOST, |event, errors| {
            require_tag(event, "e", errors);
        });

        validator.register(kinds::REACTION, |event, errors| {
            require_tag(event, "e", errors);
            if !REACTION_CONTENT_VALUES.contains(&event.content.as_str()) {
                errors.push(FieldError::new(
                    "content",
                    format!("must be one of {}", REACTION_CONTENT_VALUES.join(", ")),
                ));
            }
        });

        validator.register(kinds::POLL, |event, errors| {
            let Some(payload) = parse_json_object(event, errors) else {
                return;
            };
            require_json_string(&payload, "question", errors);
            match payload.get("options").and_then(Value::as_array) {
                Some(options)
                    if options.len() >= 2
                        && options
                            .iter()
                            .all(|o| o.as_str().is_some_and(|s| !s.trim().is_empty())) => {}
                _ => errors.push(FieldError::new(
                    "content.options",
                    "must be an array of at least 2 non-empty strings",
                )),
            }
        });

        validator.register(kinds::COMMENT, move |event, errors| {
            if !["E", "e", "A", "a"].iter().any(|name| event.has_tag(name)) {
                errors.push(FieldError::new(
                    "tags",
                    "comment must reference the event it replies to (e, E, a or A tag)",
                ));
            }
            require_text(event, text_limit, errors);
        });

        validator.register(kinds::COMMUNITY_APPROVAL, |event, errors| {
            require_tag(event, "a", errors);
            require_tag(event, "e", errors);
        });

        validator.register(kinds::LONG_FORM_ARTICLE, move |event, errors| {
            require_tag(event, "d", errors);
            if event.content.chars().count() > long_form_limit {
                errors.push(FieldError::new(
                    "content",
                    format!("must be at most {long_form_limit} characters"),
                ));
            }
        });

        validator.register(kinds::COMMUNITY_DEFINITION, |event, errors| {
            require_tag(event, "d", errors);
            if let Some(payload) = parse_json_object(event, errors) {
                require_json_string(&payload, "name", errors);
            }
        });

        validator
    }

    /// Add a rule for `kind`. Rules for the same kind run in registration order.
    pub fn register<F>(&mut self, kind: u32, rule: F)
    where
        F: Fn(&UnsignedEvent, &mut Vec<FieldError>) + Send + Sync + 'static,
    {
        self.rules.entry(kind).or_default().push(Arc::new(rule));
    }

    pub fn has_rules_for(&self, kind: u32) -> bool {
        self.rules.contains_key(&kind)
    }
}

impl EventValidator for ContentValidator {
    fn name(&self) -> &'static str {
        "content"
    }

    fn check(&self, event: &UnsignedEvent, _now: i64, errors: &mut Vec<FieldError>) {
        if let Some(rules) = self.rules.get(&event.kind) {
            for rule in rules {
                rule(event, errors);
            }
        }
    }
}

fn require_tag(event: &UnsignedEvent, name: &str, errors: &mut Vec<FieldError>) {
    if !event.tag_values(name).any(|v| !v.is_empty()) {
        errors.push(FieldError::new(
            "tags",
            format!("missing required '{name}' tag"),
        ));
    }
}

fn require_text(event: &UnsignedEvent, limit: usize, errors: &mut Vec<FieldError>) {
    if event.content.trim().is_empty() {
        errors.push(FieldError::new("content", "must not be empty"));
    } else if event.content.chars().count() > limit {
        errors.push(FieldError::new(
            "content",
            format!("must be at most {limit} characters"),
        ));
    }
}

fn parse_json_object(event: &UnsignedEvent, errors: &mut Vec<FieldError>) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(&event.content) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            errors.push(FieldError::new("content", "must be a JSON object"));
            None
        }
        Err(e) => {
            errors.push(FieldError::new("content", format!("invalid JSON: {e}")));
            None
        }
    }
}

fn require_json_string(payload: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) {
    let present = payload
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !present {
        errors.push(FieldError::new(
            format!("content.{key}"),
            "must be a non-empty string",
        ));
    }
}
