//! Unified error types for mull

use thiserror::Error;

/// Unified error type for all mull operations
#[derive(Error, Debug)]
pub enum MullError {
    // Store errors
    #[error("Duplicate perspective: {0}")]
    DuplicatePerspective(String),

    #[error("Perspective not found: {0}")]
    PerspectiveNotFound(String),

    #[error("Invalid perspective: {0}")]
    InvalidPerspective(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Report errors
    #[error("Report generation failed: {0}")]
    ReportGeneration(String),

    #[error("Evolution log error: {0}")]
    EvolutionLog(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl MullError {
    /// Whether the caller can skip or retry the current iteration and carry on.
    ///
    /// Only a broken configuration is fatal; it cannot heal between iterations.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicatePerspective(_))
    }
}

/// Result type alias using MullError
pub type Result<T> = std::result::Result<T, MullError>;
