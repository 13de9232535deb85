//! Error types for the tunnel core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, deriving or fabricating data.
#[derive(Error, Debug)]
pub enum Error {
    /// Buffer is shorter than a required fixed or declared field
    #[error("insufficient data: need {needed} bytes, have {available}")]
    InsufficientData {
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the input
        available: usize,
    },

    /// Input is structurally invalid (bad magic, compression pointer, all-zero plaintext, ...)
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Caller-supplied output buffer cannot hold the result
    #[error("buffer too small: need {needed} bytes, capacity {capacity}")]
    BufferTooSmall {
        /// Bytes the output requires
        needed: usize,
        /// Size of the supplied buffer
        capacity: usize,
    },

    /// Cipher suite identifier is not a supported TLS 1.3 suite
    #[error("invalid cipher suite: {0:#06x}")]
    InvalidCipherSuite(u16),

    /// Lookup produced no match
    #[error("not found")]
    NotFound,

    /// Primitive crypto provider failed
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O error (config or GeoIP table)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new malformed-input error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }

    /// Create a new cryptographic error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Error::Crypto(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Shorthand for a bounds failure against the remaining input.
    pub(crate) fn short(needed: usize, available: usize) -> Self {
        Error::InsufficientData { needed, available }
    }

    /// Check if the caller can retry (await more bytes or grow the buffer)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientData { .. } | Error::BufferTooSmall { .. }
        )
    }

    /// Check if this is the defined empty result of a lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidCipherSuite(0x1303);
        assert_eq!(err.to_string(), "invalid cipher suite: 0x1303");

        let err = Error::BufferTooSmall {
            needed: 44,
            capacity: 40,
        };
        assert_eq!(err.to_string(), "buffer too small: need 44 bytes, capacity 40");
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::short(5, 3).is_recoverable());
        assert!(Error::BufferTooSmall {
            needed: 2,
            capacity: 1
        }
        .is_recoverable());
        assert!(!Error::malformed("bad magic").is_recoverable());
        assert!(!Error::InvalidCipherSuite(0).is_recoverable());
        assert!(Error::NotFound.is_not_found());
    }
}
