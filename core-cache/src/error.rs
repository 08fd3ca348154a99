//! # Cache Error Types
//!
//! Error types for the circular read-ahead cache and its collaborators.
//!
//! Transient conditions (no data yet, end of stream, short writes) are not
//! errors; they are expressed through return values. Only conditions that
//! need the caller to change course are represented here.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The backing buffer could not be allocated.
    #[error("Failed to allocate {requested} byte cache buffer")]
    Allocation { requested: usize },

    /// Configuration values are inconsistent.
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// The cache has been closed and its buffer released.
    #[error("Cache is closed")]
    Closed,

    // ========================================================================
    // Window Errors
    // ========================================================================
    /// Requested position is outside the retained window.
    ///
    /// The owner of the source must reposition it and reset the cache.
    #[error("Position {position} is outside cached window [{begin}, {end}]")]
    OutOfWindow { position: u64, begin: u64, end: u64 },

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The underlying byte source failed.
    #[error("Source error: {0}")]
    Source(#[from] std::io::Error),

    /// The source pump is no longer running.
    #[error("Source pump stopped")]
    PumpStopped,
}

impl CacheError {
    /// Returns `true` if the caller can recover by repositioning the source.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CacheError::OutOfWindow { .. } | CacheError::Source(_))
    }

    /// Returns `true` if the cache can no longer be used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CacheError::Allocation { .. } | CacheError::Closed | CacheError::PumpStopped
        )
    }
}

impl From<CacheError> for std::io::Error {
    fn from(err: CacheError) -> Self {
        use std::io::ErrorKind;

        match err {
            CacheError::Source(e) => e,
            CacheError::Closed | CacheError::PumpStopped => {
                std::io::Error::new(ErrorKind::BrokenPipe, err.to_string())
            }
            CacheError::OutOfWindow { .. } | CacheError::InvalidConfig(_) => {
                std::io::Error::new(ErrorKind::InvalidInput, err.to_string())
            }
            CacheError::Allocation { .. } => {
                std::io::Error::new(ErrorKind::OutOfMemory, err.to_string())
            }
        }
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let out = CacheError::OutOfWindow {
            position: 0,
            begin: 1,
            end: 24,
        };
        assert!(out.is_recoverable());
        assert!(!out.is_fatal());

        let alloc = CacheError::Allocation { requested: 64 };
        assert!(alloc.is_fatal());
        assert!(!alloc.is_recoverable());

        assert!(CacheError::Closed.is_fatal());
        assert!(!CacheError::InvalidConfig("x".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let out = CacheError::OutOfWindow {
            position: 0,
            begin: 1,
            end: 24,
        };
        assert_eq!(
            out.to_string(),
            "Position 0 is outside cached window [1, 24]"
        );

        let io = CacheError::from(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short",
        ));
        assert!(matches!(io, CacheError::Source(_)));
        assert_eq!(io.to_string(), "Source error: short");
    }

    #[test]
    fn test_into_io_error() {
        let err: std::io::Error = CacheError::Closed.into();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);

        let source = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        let err: std::io::Error = CacheError::Source(source).into();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
        assert_eq!(err.to_string(), "slow");
    }
}
