// src/error.rs

//! Error types for recipe parsing and cooking

use thiserror::Error;

/// Errors raised while reading, validating, or cooking a recipe
#[derive(Error, Debug)]
pub enum Error {
    /// Recipe could not be parsed or contains a malformed field
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Recipe parsed but violates an invariant
    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),

    /// Source download failed
    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Downloaded or cached source does not match the declared digest
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Build or test requirements could not be satisfied
    #[error("Resolution error: {0}")]
    ResolutionError(String),

    /// The build script exited non-zero, timed out, or installed nothing
    #[error("Build failed: {0}")]
    BuildFailed(String),

    /// The test script exited non-zero or the artifact was unusable
    #[error("Test failed: {0}")]
    TestFailed(String),

    /// An artifact for this (name, version, build number) already exists
    #[error("Already published: {0}")]
    AlreadyPublished(String),

    /// A referenced file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O failure with context
    #[error("I/O error: {0}")]
    IoError(String),

    /// I/O failure without context
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, Error>;
