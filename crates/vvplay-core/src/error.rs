//! Error types for vvplay.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for vvplay operations.
#[derive(Error, Debug)]
pub enum VvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid variant index {index} (catalog has {count} variants)")]
    InvalidVariantIndex { index: usize, count: usize },

    #[error("Invalid variant: {0}")]
    InvalidVariant(String),

    #[error("Decode failed for {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Decoder reported {count} points for {path}")]
    EmptyFrame { path: PathBuf, count: i64 },

    #[error("Frame loader did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: &'static str, action: &'static str },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VvError {
    /// Whether this error belongs to the decode path (recovered inside the loader).
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::EmptyFrame { .. } | Self::Io(_))
    }
}

/// Result type alias for vvplay operations.
pub type Result<T> = std::result::Result<T, VvError>;
