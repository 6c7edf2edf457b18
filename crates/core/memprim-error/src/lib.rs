//! Unified error handling for the memprim workspace
//!
//! The raw primitives (`word_move`, `word_fill`, ...) have no failure mode:
//! violating their caller contract is undefined behaviour, not an error.
//! Everything around them (region allocation, safe slice wrappers,
//! configuration loading, candidate lookup) reports through [`MemError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for all memprim components
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemError {
    #[error("Memory allocation failed: {size} bytes aligned to {align}")]
    AllocationFailed { size: usize, align: usize },

    #[error("Invalid memory layout: size {size}, align {align}")]
    InvalidLayout { size: usize, align: usize },

    #[error("Access out of bounds: offset {offset} + length {length} exceeds capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        length: usize,
        capacity: usize,
    },

    #[error("Length mismatch: destination {dest} bytes, source {source_len} bytes")]
    LengthMismatch { dest: usize, source_len: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown candidate implementation: {0}")]
    UnknownCandidate(String),

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl MemError {
    /// Bounds check shared by every safe wrapper.
    pub fn check_bounds(offset: usize, length: usize, capacity: usize) -> MemResult<()> {
        match offset.checked_add(length) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(MemError::OutOfBounds {
                offset,
                length,
                capacity,
            }),
        }
    }

    /// Severity of the error for reporting purposes
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MemError::AllocationFailed { .. } | MemError::InvalidLayout { .. } => {
                ErrorSeverity::Critical
            }
            MemError::OutOfBounds { .. } | MemError::LengthMismatch { .. } => ErrorSeverity::Error,
            MemError::InvalidConfig(_)
            | MemError::UnknownCandidate(_)
            | MemError::Parse { .. } => ErrorSeverity::Error,
            MemError::Io { .. } => ErrorSeverity::Warning,
        }
    }

    /// Allocation problems abort a run; everything else is reported and the
    /// caller decides.
    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

impl From<std::io::Error> for MemError {
    fn from(err: std::io::Error) -> Self {
        MemError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type MemResult<T> = Result<T, MemError>;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Log an error with the component that produced it
pub fn log_error(error: &MemError, component: &str) {
    log::error!("[{}] {}: {}", error.severity(), component, error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_bounds() {
        assert!(MemError::check_bounds(0, 0, 0).is_ok());
        assert!(MemError::check_bounds(10, 6, 16).is_ok());
        assert_eq!(
            MemError::check_bounds(10, 7, 16),
            Err(MemError::OutOfBounds {
                offset: 10,
                length: 7,
                capacity: 16
            })
        );
        // usize overflow must not wrap around into a valid range
        assert!(MemError::check_bounds(usize::MAX, 2, 16).is_err());
    }

    #[test]
    fn test_display_messages() {
        let err = MemError::AllocationFailed {
            size: 4096,
            align: 64,
        };
        assert_eq!(
            err.to_string(),
            "Memory allocation failed: 4096 bytes aligned to 64"
        );

        let err = MemError::UnknownCandidate("turbo".to_string());
        assert_eq!(err.to_string(), "Unknown candidate implementation: turbo");
    }

    #[test]
    fn test_severity() {
        assert!(MemError::AllocationFailed { size: 1, align: 64 }.is_fatal());
        assert!(!MemError::InvalidConfig("x".into()).is_fatal());
        assert_eq!(
            MemError::Io {
                message: "gone".into()
            }
            .severity(),
            ErrorSeverity::Warning
        );
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: MemError = io.into();
        assert!(matches!(err, MemError::Io { ref message } if message.contains("missing.json")));
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = MemError::LengthMismatch {
            dest: 3,
            source_len: 4,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: MemError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
