//! Error types for batch-rename
//!
//! This module provides the error taxonomy of the renaming and archival pipeline:
//! - Read failures that name the offending file
//! - A distinguishable cancellation failure
//! - Packaging failures, classified for logging but surfaced unchanged
//! - Delivery, configuration and input validation errors

use thiserror::Error;

/// Result type alias for batch-rename operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batch-rename
///
/// No variant is retried by the library. Callers decide how to present each one;
/// [`Error::Cancelled`] in particular is an expected outcome of a user abort and
/// is usually not shown as an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A source file's content could not be read (moved, deleted, permission revoked)
    #[error("failed to read {name}: {source}")]
    Read {
        /// Original name of the file that could not be read
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The operation was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Building an archive failed
    #[error("failed to package {archive}: {source}")]
    Packaging {
        /// File name of the archive being built
        archive: String,
        /// Error reported by the ZIP writer
        #[source]
        source: zip::result::ZipError,
    },

    /// A finished archive (or file) could not be handed to the sink
    #[error("failed to deliver {name}: {source}")]
    Delivery {
        /// File name of the delivery that failed
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Two entries resolved to the same name and the collision action is `Fail`
    #[error("name collision: {name} is produced more than once")]
    NameCollision {
        /// The colliding (sanitized) entry name
        name: String,
    },

    /// Inputs passed to the pipeline are inconsistent
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_batch_files")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is the cancellation failure
    ///
    /// Hosts use this to suppress error messaging for user-requested aborts.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Read { .. } => "read_failed",
            Error::Cancelled => "cancelled",
            Error::Packaging { source, .. } => match PackagingFailureKind::classify(source) {
                PackagingFailureKind::OutOfMemory => "packaging_out_of_memory",
                PackagingFailureKind::Generic => "packaging_failed",
            },
            Error::Delivery { .. } => "delivery_failed",
            Error::NameCollision { .. } => "name_collision",
            Error::InvalidInput(_) => "invalid_input",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Operator-facing category of a packaging failure
///
/// Only used for logging; the failure itself is returned to the caller unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackagingFailureKind {
    /// The packager ran out of memory (allocation failure, buffer too large)
    OutOfMemory,
    /// Any other packaging failure
    Generic,
}

impl PackagingFailureKind {
    /// Classify a ZIP writer error by its kind and message
    pub fn classify(err: &zip::result::ZipError) -> Self {
        if let zip::result::ZipError::Io(io) = err
            && io.kind() == std::io::ErrorKind::OutOfMemory
        {
            return PackagingFailureKind::OutOfMemory;
        }
        Self::classify_message(&err.to_string())
    }

    /// Classify a failure message by pattern matching
    pub fn classify_message(message: &str) -> Self {
        const OOM_PATTERNS: &[&str] = &[
            "out of memory",
            "outofmemory",
            "memory allocation",
            "allocation failed",
            "cannot allocate",
            "capacity overflow",
            "array buffer allocation",
        ];

        let lower = message.to_lowercase();
        if OOM_PATTERNS.iter().any(|p| lower.contains(p)) {
            PackagingFailureKind::OutOfMemory
        } else {
            PackagingFailureKind::Generic
        }
    }

    /// Short label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            PackagingFailureKind::OutOfMemory => "out_of_memory",
            PackagingFailureKind::Generic => "generic",
        }
    }
}
