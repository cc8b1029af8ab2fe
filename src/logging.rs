//! Logging utilities for cfbridge.
//!
//! This module provides structured logging functionality so that reads,
//! writes and metadata synthesis can be traced per file and per operation.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

/// Initialize the tracing subscriber. `RUST_LOG` wins over `log_level`.
///
/// Logs go to stderr so that the inspection output on stdout stays clean.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Log the start of a pass over the variables of a file
pub fn log_operation_start(operation: &str, variables: usize) {
    debug!(operation = operation, variables = variables, "Scanning variables");
}

/// Log the end of a pass over a file, with the number of items it produced
/// or `None` if it failed
pub fn log_operation_end(operation: &str, start_time: Instant, items: Option<usize>) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    match items {
        Some(items) => info!(
            operation = operation,
            items = items,
            duration_ms = duration_ms,
            "Exchange items created"
        ),
        None => warn!(
            operation = operation,
            duration_ms = duration_ms,
            "No exchange items created"
        ),
    }
}

/// Run a file operation under an operation id and log its outcome and timing
pub fn log_timed_operation<T, F>(operation: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let start = Instant::now();
    let operation_id = generate_operation_id();
    debug!(operation = operation, operation_id = %operation_id, "Starting");

    let result = f();
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    match &result {
        Ok(_) => info!(
            operation = operation,
            operation_id = %operation_id,
            duration_ms = duration_ms,
            "Done"
        ),
        Err(e) => warn!(
            operation = operation,
            operation_id = %operation_id,
            duration_ms = duration_ms,
            error = %e,
            "Failed"
        ),
    }

    result
}

/// Log what a write session declared in a file
pub fn log_session_stats(
    time_dimensions: usize,
    grids: usize,
    data_variables: &[&str],
    stations: usize,
) {
    info!(
        operation = "write_metadata",
        time_dimensions = time_dimensions,
        grids = grids,
        data_variables = %data_variables.join(", "),
        stations = stations,
        "Metadata written"
    );
}

/// Log an error with what the bridge was doing when it happened
pub fn log_error(error: &BridgeError, context: &str) {
    error!(context = context, error = %error, details = ?error, "Bridge error");
}

/// Generate a unique operation ID
pub fn generate_operation_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_operation_id() {
        assert_ne!(generate_operation_id(), generate_operation_id());
    }

    #[test]
    fn test_log_timed_operation_passes_result_through() {
        assert_eq!(log_timed_operation("declare", || Ok(3)).unwrap(), 3);

        let result: Result<()> = log_timed_operation("write_metadata", || {
            Err(BridgeError::InvalidState {
                message: "metadata already written".to_string(),
            })
        });
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
    }
}
