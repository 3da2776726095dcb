//! # Structured Logging Module
//!
//! Environment-aware structured logging for the asynchronous signing and
//! publishing pipeline. Console output is human readable by default and JSON
//! when `RELAYCAST_LOG_FORMAT=json`.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let console = if use_json_format() {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // A host application may already have installed a global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("RELAYCAST_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("RELAYCAST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for an event pipeline operation
pub fn log_event_operation(
    operation: &str,
    event_id: Option<&str>,
    kind: Option<u32>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        event_id = event_id,
        kind = kind,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "EVENT_OPERATION"
    );
}

/// Log structured data for queue operations
pub fn log_queue_operation(
    operation: &str,
    queue_id: Option<&str>,
    priority: Option<&str>,
    queued: usize,
    in_flight: usize,
) {
    tracing::debug!(
        operation = %operation,
        queue_id = queue_id,
        priority = priority,
        queued = queued,
        in_flight = in_flight,
        "QUEUE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
