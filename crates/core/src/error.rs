//! Error types for the loreguard domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Every variant carries
//! enough context (constraint id or event position) to reproduce the failure.

use thiserror::Error;

/// The top-level error type for all loreguard operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Registry errors ---
    #[error("Duplicate constraint id: {id}")]
    DuplicateConstraintId { id: String },

    #[error("Invalid constraint '{id}': {reason}")]
    InvalidConstraint { id: String, reason: String },

    // --- Narrative errors ---
    #[error("Malformed event at position {position}: {reason}")]
    MalformedEvent { position: usize, reason: String },

    // --- Configuration errors ---
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
