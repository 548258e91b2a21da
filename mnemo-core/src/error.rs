//! Error types for the mnemo core library.

use thiserror::Error;

use crate::memory::MemoryKind;

/// Top-level error type for all mnemo operations.
#[derive(Error, Debug)]
pub enum MnemoError {
    /// The embedding provider failed to produce vectors.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A vector did not have the dimensionality the index was built with.
    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimensionality of the existing index.
        expected: usize,
        /// Dimensionality of the offending vector.
        got: usize,
    },

    /// An index was requested for a category with no texts.
    #[error("Empty corpus for category {0}")]
    EmptyCorpus(MemoryKind),

    /// A category name could not be parsed.
    #[error("Unknown memory category: {0}")]
    UnknownCategory(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A persisted snapshot could not be decoded or is internally inconsistent.
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, MnemoError>;
