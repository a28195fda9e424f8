//! Error types for scalelink

use thiserror::Error;

/// Result type alias for scalelink operations
pub type Result<T> = std::result::Result<T, ScaleError>;

/// Main error type for scalelink
///
/// Encoding defects (missing fields, unexpected value kinds) are not errors:
/// the encoder degrades them to empty fragments. Everything here aborts at
/// least the current scale system bucket.
#[derive(Error, Debug)]
pub enum ScaleError {
    #[error("Could not open transport session to {target}: {message}")]
    TransportOpen { target: String, message: String },

    #[error("Transfer of '{path}' failed: {message}")]
    TransportWrite { path: String, message: String },

    #[error("Invalid file name pattern '{0}'")]
    InvalidPattern(String),

    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScaleError {
    /// Session establishment failed (network or authentication)
    pub fn transport_open(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::TransportOpen {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Upload or local temporary file I/O failed
    pub fn transport_write(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::TransportWrite {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn database(message: impl std::fmt::Display) -> Self {
        Self::Database(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_messages() {
        let open = ScaleError::transport_open("ftp://scale@10.0.0.5:21", "connection refused");
        assert_eq!(
            open.to_string(),
            "Could not open transport session to ftp://scale@10.0.0.5:21: connection refused"
        );

        let write = ScaleError::transport_write("/csv/ARTI.csv", "disk full");
        assert_eq!(write.to_string(), "Transfer of '/csv/ARTI.csv' failed: disk full");
    }

    #[test]
    fn test_io_error_converts() {
        let err: ScaleError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ScaleError::Io(_)));
    }
}
