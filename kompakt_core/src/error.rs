//! Error types for kompakt_core.

use thiserror::Error;

/// Result type alias using kompakt_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during compression, framing, traversal, or scheduling.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad constructor or call input (empty path, missing directory, non-file path).
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Container is malformed: wrong magic, unsupported version, short header or record.
    #[error("Format error: {reason}")]
    Format { reason: String },

    /// The payload ran out before the declared original size was produced.
    #[error("Truncated stream: expected {expected} bytes, produced {produced}")]
    TruncatedStream { expected: u64, produced: u64 },

    /// Frequency table or bit stream does not describe a walkable tree.
    #[error("Corrupt Huffman tree: {reason}")]
    CorruptTree { reason: String },

    /// A code that is neither in the dictionary nor the next code to be assigned.
    #[error("Invalid LZW code {code} at position {position}")]
    InvalidCode { code: u16, position: usize },

    /// The LZW encoder reached an emit point with no current match.
    #[error("LZW encoder invariant violated: empty current match")]
    EmptyMatch,

    /// Work was submitted after the pool started shutting down.
    #[error("Task pool is stopped")]
    PoolStopped,

    /// A submitted task panicked on its worker.
    #[error("Task panicked: {message}")]
    TaskPanicked { message: String },
}

impl Error {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a Format error.
    pub fn format(reason: impl Into<String>) -> Self {
        Error::Format {
            reason: reason.into(),
        }
    }

    /// Create a TruncatedStream error.
    pub fn truncated_stream(expected: u64, produced: u64) -> Self {
        Error::TruncatedStream { expected, produced }
    }

    /// Create a CorruptTree error.
    pub fn corrupt_tree(reason: impl Into<String>) -> Self {
        Error::CorruptTree {
            reason: reason.into(),
        }
    }

    /// Create an InvalidCode error.
    pub fn invalid_code(code: u16, position: usize) -> Self {
        Error::InvalidCode { code, position }
    }

    /// Create a TaskPanicked error.
    pub fn task_panicked(message: impl Into<String>) -> Self {
        Error::TaskPanicked {
            message: message.into(),
        }
    }

    /// Whether this error came from a codec rejecting its input.
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            Error::TruncatedStream { .. }
                | Error::CorruptTree { .. }
                | Error::InvalidCode { .. }
                | Error::EmptyMatch
        )
    }

    /// Whether this error came from container framing.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Format { .. })
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path/loop error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
