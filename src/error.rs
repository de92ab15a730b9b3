//! Error types for Faktum.

use thiserror::Error;

/// Library-level error type for Faktum operations.
#[derive(Error, Debug)]
pub enum FaktumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Audio conversion failed: {0}")]
    AudioConversion(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Fact check failed: {0}")]
    FactCheck(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

/// Result type alias for Faktum operations.
pub type Result<T> = std::result::Result<T, FaktumError>;
