//! Structured logging configuration.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the CLI's own `tracing` events.

use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Output goes to stderr so command results on stdout stay machine-readable.
/// Levels are configurable via the `RUST_LOG` env var.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Structured logging initialized");
}

/// Log the outcome of one engine operation
///
/// # Arguments
///
/// * `operation` - Subcommand name
/// * `code` - `"OK"` or the error code returned
/// * `elapsed` - Wall time of the call
pub fn log_operation(operation: &str, code: &str, elapsed: Duration) {
    let duration_ms = elapsed.as_millis() as u64;
    if code == "OK" {
        tracing::info!(operation, duration_ms, "Operation completed");
    } else {
        tracing::warn!(operation, code, duration_ms, "Operation rejected");
    }
    log_performance(operation, duration_ms);
}

/// Log performance metric, warning on slow operations
pub fn log_performance(operation: &str, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(operation, duration_ms, "PERFORMANCE: Slow operation");
    } else {
        tracing::debug!(operation, duration_ms, "Performance metric");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_operation() {
        // Just ensure it doesn't panic
        log_operation("start", "OK", Duration::from_millis(12));
        log_operation("report", "ALREADY_REPORTED", Duration::from_millis(3));
    }

    #[test]
    fn test_log_performance() {
        log_performance("bracket", 500);
        log_performance("enqueue", 2000);
    }
}
