//! Centralized error types for eml2msg.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the eml2msg library.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input file does not exist.
    #[error("Input file not found: {0}")]
    FileNotFound(PathBuf),

    /// The input could not be parsed as an RFC 5322 message.
    #[error("Could not parse '{0}' as an email message")]
    Parse(PathBuf),

    /// Building the destination compound file failed.
    #[error("Encoding error: {0}")]
    Encode(String),
}

/// Convenience alias for `Result<T, ConvertError>`.
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for the "input does not exist" case, which the CLI reports
    /// separately from every other failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_))
    }
}

/// Errors from the in-memory compound file carry no useful path, so they
/// surface as encoding failures.
impl From<std::io::Error> for ConvertError {
    fn from(source: std::io::Error) -> Self {
        Self::Encode(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ConvertError::FileNotFound(PathBuf::from("/tmp/missing.eml"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Input file not found: /tmp/missing.eml");
    }

    #[test]
    fn test_io_keeps_path() {
        let err = ConvertError::io(
            "out.msg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("out.msg"));
        assert!(err.to_string().contains("denied"));
    }
}
