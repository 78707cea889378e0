//! Common error types for UPA

use thiserror::Error;

/// Common result type for UPA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by configuration and record loading
///
/// The pricing engine itself never fails on malformed numbers; it substitutes
/// sentinels and logs. These errors only cover the structural layer around it.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML run configuration could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON unit records or price tables could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
