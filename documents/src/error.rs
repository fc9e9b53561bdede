//! Error types for record conversion and record loading.

use thiserror::Error;

use crate::record::RecordKind;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while loading records or building documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A record could not be converted into documents.
    #[error("{kind} record {} could not be built: {reason}", .source_id.as_deref().unwrap_or("<unknown>"))]
    Build {
        /// Kind of the offending record.
        kind: RecordKind,
        /// Identifier of the record, when one could be determined.
        source_id: Option<String>,
        /// Why the record was rejected.
        reason: String,
    },

    /// The record source could not be read.
    #[error("record source error: {0}")]
    Source(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// Shorthand for a build failure on a record.
    pub fn build(kind: RecordKind, source_id: Option<&str>, reason: impl Into<String>) -> Self {
        Self::Build {
            kind,
            source_id: source_id.map(str::to_string),
            reason: reason.into(),
        }
    }
}
