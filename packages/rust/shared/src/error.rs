//! Error types for the water quality auditor.
//!
//! Library crates use [`AuditError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all auditor operations.
///
/// Each external-call stage has its own variant; any of them aborts the
/// whole pipeline for that request.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Pre-flight validation failed (no image, or an empty required field).
    #[error("missing input: {message}")]
    MissingInput { message: String },

    /// Visual analysis or risk mapping failed.
    #[error("analysis service error: {0}")]
    AnalysisService(String),

    /// Resource search failed.
    #[error("search service error: {0}")]
    SearchService(String),

    /// Report composition failed.
    #[error("composition service error: {0}")]
    CompositionService(String),

    /// Transport, HTTP status, or response-shape failure inside a provider adapter.
    #[error("provider error: {0}")]
    Provider(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AuditError>;

impl AuditError {
    /// Create a missing-input error from any displayable message.
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = AuditError::missing_input("no image was uploaded");
        assert_eq!(err.to_string(), "missing input: no image was uploaded");

        let err = AuditError::AnalysisService("HTTP 500".into());
        assert!(err.to_string().starts_with("analysis service error"));

        let err = AuditError::config("OPENAI_API_KEY not set");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
