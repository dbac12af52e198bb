//! Error types for dealbot

use thiserror::Error;

/// Main error type for dealbot
#[derive(Error, Debug)]
pub enum DealbotError {
    // Collaborator errors
    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Text generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    #[error("Intent classification failed: {0}")]
    Classification(String),

    // Session errors
    #[error("Negotiation session not found: {0}")]
    SessionNotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for dealbot operations
pub type Result<T> = std::result::Result<T, DealbotError>;
