//! Error types for cfbridge.
//!
//! One enum covers every failure the bridge can report. Discovery misses are
//! not errors and never show up here; they are `None` results instead.

use thiserror::Error;

/// The main error type for cfbridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Errors raised by the NetCDF library itself
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Errors raised by a storage backend (bad window, unknown name, ...)
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Operand length does not match the selected slice
    #[error("Length mismatch for item {item_id}: expected {expected} values, got {actual}")]
    LengthMismatch {
        item_id: String,
        expected: usize,
        actual: usize,
    },

    /// Value type that cannot be stored in a NetCDF variable
    #[error("Unsupported value type {value_type} for item {item_id}")]
    UnsupportedValueType { item_id: String, value_type: String },

    /// Item without quantity metadata cannot be written
    #[error("Item {item_id} has no quantity info, cannot write it")]
    MissingQuantity { item_id: String },

    /// Operation not available for this item kind
    #[error("Operation {operation} is not supported by item {item_id}")]
    Unsupported { item_id: String, operation: String },

    /// Units string that is not a CF time unit
    #[error("Invalid time unit: {unit}")]
    InvalidTimeUnit { unit: String },

    /// Operation called in a state where it cannot succeed
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl BridgeError {
    /// Shorthand for a storage-layer error
    pub fn storage(message: impl Into<String>) -> Self {
        BridgeError::Storage {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
