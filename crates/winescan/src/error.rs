//! Error types for winescan.
//!
//! This module defines all error types used throughout the winescan crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for winescan operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the history database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Catalog Errors ===
    /// The catalog file could not be read.
    #[error("failed to read catalog at {path}: {source}")]
    CatalogRead {
        /// Path to the catalog file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The catalog document is not a JSON object of records.
    #[error("malformed catalog: {message}")]
    CatalogFormat {
        /// Description of what was wrong with the document.
        message: String,
    },

    // === Scanning Errors ===
    /// The scan source could not be acquired.
    #[error("failed to start scan source '{name}': {message}")]
    SourceStart {
        /// Name of the scan source.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// Device enumeration failed.
    #[error("failed to list devices for '{name}': {message}")]
    DeviceList {
        /// Name of the scan source.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for winescan operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a malformed catalog error.
    #[must_use]
    pub fn catalog_format(message: impl Into<String>) -> Self {
        Self::CatalogFormat {
            message: message.into(),
        }
    }

    /// Create a scan source start error.
    #[must_use]
    pub fn source_start(name: &'static str, message: impl Into<String>) -> Self {
        Self::SourceStart {
            name,
            message: message.into(),
        }
    }

    /// Create a device enumeration error.
    #[must_use]
    pub fn device_list(name: &'static str, message: impl Into<String>) -> Self {
        Self::DeviceList {
            name,
            message: message.into(),
        }
    }

    /// Check if this error came from acquiring a scan source.
    #[must_use]
    pub fn is_acquisition_error(&self) -> bool {
        matches!(self, Self::SourceStart { .. })
    }

    /// Check if this error is a catalog problem.
    ///
    /// Catalog problems are never fatal; callers degrade to an empty catalog.
    #[must_use]
    pub fn is_catalog_error(&self) -> bool {
        matches!(self, Self::CatalogRead { .. } | Self::CatalogFormat { .. })
    }
}
