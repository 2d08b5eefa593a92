//! Error types and handling
//!
//! This module provides the error types used throughout the catalog engine.
//! All errors implement the `CatalogErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Propagation
//!
//! - `Decode` and per-call `Lookup` errors are caught at the tool-dispatch
//!   boundary and turned into an error payload for the model.
//! - `ModelTransport` aborts the current user turn only.
//! - `StoreUnavailable` is fatal to the session.

use thiserror::Error;

/// Trait for catalog error extensions
///
/// Provides additional context for errors, including user-friendly hints and
/// recoverability information. All engine errors implement this trait.
pub trait CatalogErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains API keys
    /// or raw transport payloads.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors leave the session usable: the user can simply retype
    /// the question. Non-recoverable errors end the session.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{CatalogErrorExt, EngineError};
///
/// let error = EngineError::Decode("expected an object".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::StoreUnavailable("connection refused".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Tool argument errors
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    // Record store errors
    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    // Mail launch errors
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // Language model errors
    #[error("Model transport error: {0}")]
    ModelTransport(String),

    // Ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::Decode(_) => "The model sent malformed tool arguments. Try rephrasing",
            Self::UnknownField(_) => "The model asked for a field the catalog does not have",

            Self::Lookup(_) => "Course lookup failed. Check that the vector store is running",
            Self::StoreUnavailable(_) => {
                "The vector store is unreachable. Start it and restart the session"
            }

            Self::UnsupportedPlatform(_) => "Opening a mail client is not supported here",

            Self::ModelTransport(_) => "The language model did not respond. Try again",

            Self::Ingest(_) => "The course schedule could not be loaded. Check the CSV file",

            Self::Database(_) => "Transcript storage failed. History may be incomplete",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::StoreUnavailable(_) | Self::Config(_) => false,

            // All other errors leave the session usable
            _ => true,
        }
    }
}
