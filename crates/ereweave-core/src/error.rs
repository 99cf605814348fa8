//! # Error Module
//!
//! Errors exist only at the document boundary: reading graphs, queries,
//! configuration and snapshots. The search itself never fails; unfillable
//! constraints and rejected statements are ordinary outcomes.

use thiserror::Error;

/// Errors raised while loading or saving engine documents.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON document could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary snapshot could not be encoded or decoded.
    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] postcard::Error),

    /// Snapshot header is missing or has an unsupported version.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Query document is structurally malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
