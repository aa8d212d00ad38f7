//! Error types for opchain.
//!
//! Every fatal condition of a run maps to one variant here. Per-operation
//! execution failures are not errors: they are recorded in `OpResult` and only
//! escalate to [`OpchainError::Halted`] when the operation has halt-if-fail set.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for opchain.
#[derive(Error, Debug)]
pub enum OpchainError {
    /// Malformed directive or unterminated capture in the expanded config
    #[error("parse error in {source_ref} at line {line}: {message}")]
    Parse {
        source_ref: String,
        line: usize,
        message: String,
    },

    /// Inclusion expansion failed (depth bound or repeated expansion)
    #[error("include error: {0}")]
    Include(String),

    /// A config reference could not be fetched
    #[error("cannot resolve {reference}: {message}")]
    Resolve { reference: String, message: String },

    /// A state-directory write failed
    #[error("cannot write state file {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An operation with halt-if-fail set did not succeed
    #[error("op #{sequence} ({label}) failed and halt-if-fail is set")]
    Halted { sequence: u32, label: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for opchain operations
pub type Result<T> = std::result::Result<T, OpchainError>;

impl OpchainError {
    /// Create a parse error at a line of a named source
    pub fn parse(source_ref: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            source_ref: source_ref.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Create a resolve error for a config reference
    pub fn resolve(reference: &str, message: impl Into<String>) -> Self {
        Self::Resolve {
            reference: reference.to_string(),
            message: message.into(),
        }
    }

    /// Create a persistence error for a state file path
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_parse_display() {
        let err = OpchainError::parse("site.conf", 12, "new-op requires a label");
        assert_eq!(
            err.to_string(),
            "parse error in site.conf at line 12: new-op requires a label"
        );
    }

    #[test]
    fn test_error_persist_display() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = OpchainError::persist("/state/00001.a.output", io);
        let msg = err.to_string();
        assert!(msg.contains("/state/00001.a.output"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_halted_display() {
        let err = OpchainError::Halted {
            sequence: 3,
            label: "install-pkgs".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "op #3 (install-pkgs) failed and halt-if-fail is set"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: OpchainError = io.into();
        assert!(matches!(err, OpchainError::Io(_)));
    }
}
