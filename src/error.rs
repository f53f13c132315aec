//! Error types for vmforge.
//!
//! This module defines the error types used throughout vmforge, providing
//! rich error information for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vmforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for vmforge.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Generator Errors
    // ========================================================================
    /// Generator not found in the registry.
    #[error("Generator '{0}' not found")]
    GeneratorNotFound(String),

    /// Missing required configuration field.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Invalid configuration field value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration failed structural validation.
    #[error("Validation failed for '{generator}': {message}")]
    ValidationFailed {
        /// Generator name
        generator: String,
        /// Joined validation errors
        message: String,
    },

    // ========================================================================
    // VHD Errors
    // ========================================================================
    /// VHD file could not be opened or read.
    #[error("Failed to read VHD '{path}': {message}")]
    VhdRead {
        /// Path to the VHD file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// VHD file is too small to carry a footer.
    #[error("VHD '{0}' is smaller than a footer (512 bytes)")]
    VhdTooSmall(PathBuf),

    // ========================================================================
    // Approval Errors
    // ========================================================================
    /// No valid approval found for a destructive operation.
    #[error("No valid approval for vault '{vault}': {message}")]
    ApprovalRequired {
        /// Vault name
        vault: String,
        /// Why the approval was rejected or missing
        message: String,
    },

    /// Approval store could not be accessed.
    #[error("Approval store error at '{path}': {message}")]
    ApprovalStore {
        /// Approval directory
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Cleanup Errors
    // ========================================================================
    /// The cleanup script executable was not found.
    #[error("Cleanup shell not found (tried {0})")]
    CleanupShellNotFound(String),

    /// The cleanup script exited with a failure code.
    #[error("Cleanup script failed with exit code {code}: {message}")]
    CleanupFailed {
        /// Script exit code
        code: i32,
        /// Captured stderr or summary
        message: String,
    },

    /// The cleanup script produced unparseable output.
    #[error("Cleanup script output could not be parsed: {0}")]
    CleanupOutput(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Template error from the helper layer.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new validation-failed error from a list of messages.
    pub fn validation_failed(generator: impl Into<String>, errors: &[String]) -> Self {
        Self::ValidationFailed {
            generator: generator.into(),
            message: errors.join("; "),
        }
    }

    /// Creates a new VHD read error.
    pub fn vhd_read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VhdRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new approval-required error.
    pub fn approval_required(vault: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApprovalRequired {
            vault: vault.into(),
            message: message.into(),
        }
    }

    /// Creates a new approval store error.
    pub fn approval_store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ApprovalStore {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ValidationFailed { .. }
            | Error::MissingParameter(_)
            | Error::InvalidParameter(_) => 2,
            Error::VhdRead { .. } | Error::VhdTooSmall(_) => 3,
            Error::ApprovalRequired { .. } | Error::ApprovalStore { .. } => 4,
            Error::CleanupShellNotFound(_)
            | Error::CleanupFailed { .. }
            | Error::CleanupOutput(_) => 5,
            Error::Config(_) | Error::TomlParse(_) => 6,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
