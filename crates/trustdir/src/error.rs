//! Error types for trustdir.
//!
//! All errors are strongly typed and propagated without panicking.
//! Secrets (trust passwords, new account passwords) are never included in
//! error messages.

use crate::directory::{DirectoryError, ResultCode};

/// Store error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous key: {0}")]
    AmbiguousKey(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Directory {operation} failed for {dn}: {source}")]
    StoreUnavailable {
        operation: &'static str,
        dn: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Password rotation failed for {dn}: {source}")]
    RotationFailed {
        dn: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Wrap a failed directory call.
    pub(crate) fn unavailable(
        operation: &'static str,
        dn: impl Into<String>,
        source: DirectoryError,
    ) -> Self {
        StoreError::StoreUnavailable {
            operation,
            dn: dn.into(),
            source,
        }
    }

    /// Directory result code behind this error, if the directory produced it.
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            StoreError::StoreUnavailable { source, .. }
            | StoreError::RotationFailed { source, .. } => Some(source.code),
            _ => None,
        }
    }

    /// `true` when a write lost a race against another writer, e.g. two
    /// concurrent upserts that both observed "absent" and both tried to add.
    pub fn is_conflict(&self) -> bool {
        self.result_code() == Some(ResultCode::ENTRY_ALREADY_EXISTS)
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, StoreError>;
