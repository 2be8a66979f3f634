//! Error types for EVIO sessions.

use std::io;
use thiserror::Error;

/// Result type for session operations.
pub type EvioResult<T> = Result<T, EvioError>;

/// Coarse error classes that callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An argument is invalid.
    BadArgument,
    /// The handle is unknown or closed.
    BadHandle,
    /// The operation does not fit how the handle was opened.
    BadMode,
    /// Memory could not be obtained.
    AllocationFailure,
    /// A header, magic number or version is structurally invalid.
    BadFile,
    /// The stream uses a format version this library cannot handle.
    UnsupportedVersion,
    /// Data ended in the middle of an event or block.
    UnexpectedEnd,
    /// A buffer is too small for the event.
    Truncation,
    /// A configuration value is out of range or arrives too late.
    BadSizeRequest,
    /// The configuration request tag is unknown.
    UnknownOption,
    /// Block numbers are out of sequence.
    BadBlock,
    /// A composite format string is invalid.
    Format,
    /// The storage layer failed.
    Storage,
}

/// Errors that can occur in session operations.
#[derive(Debug, Error)]
pub enum EvioError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] evio_storage::StorageError),

    /// Event structure error.
    #[error("codec error: {0}")]
    Codec(#[from] evio_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid argument.
    #[error("bad argument: {message}")]
    BadArgument {
        /// Description of the problem.
        message: String,
    },

    /// Unknown or closed handle.
    #[error("bad handle {handle}")]
    BadHandle {
        /// The offending handle value.
        handle: u32,
    },

    /// Operation not allowed in the handle's mode.
    #[error("bad mode: {message}")]
    BadMode {
        /// Description of the problem.
        message: String,
    },

    /// Allocation failure.
    #[error("allocation of {bytes} bytes failed")]
    AllocationFailure {
        /// Requested size.
        bytes: u64,
    },

    /// Malformed stream.
    #[error("bad file: {message}")]
    BadFile {
        /// Description of the problem.
        message: String,
    },

    /// Unsupported format version.
    #[error("unsupported format version {version}")]
    UnsupportedVersion {
        /// The version found in the header.
        version: u32,
    },

    /// Data ended mid-event or mid-block.
    #[error("unexpected end of data: {message}")]
    UnexpectedEnd {
        /// Description of where it ended.
        message: String,
    },

    /// Buffer too small.
    #[error("truncated: need {needed} words, have room for {available}")]
    Truncated {
        /// Words required.
        needed: u64,
        /// Words available.
        available: u64,
    },

    /// Invalid configuration value.
    #[error("invalid size request: {message}")]
    BadSizeRequest {
        /// Description of the problem.
        message: String,
    },

    /// Unknown configuration tag.
    #[error("unknown option {option:?}")]
    UnknownOption {
        /// The tag as given.
        option: String,
    },

    /// Out-of-sequence block under the abort policy.
    #[error("block number {found} where {expected} was expected")]
    BadBlock {
        /// Expected block number.
        expected: u32,
        /// Block number in the header.
        found: u32,
    },
}

impl EvioError {
    /// Creates a bad argument error.
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }

    /// Creates a bad mode error.
    pub fn bad_mode(message: impl Into<String>) -> Self {
        Self::BadMode {
            message: message.into(),
        }
    }

    /// Creates a bad file error.
    pub fn bad_file(message: impl Into<String>) -> Self {
        Self::BadFile {
            message: message.into(),
        }
    }

    /// Creates an unexpected end error.
    pub fn unexpected_end(message: impl Into<String>) -> Self {
        Self::UnexpectedEnd {
            message: message.into(),
        }
    }

    /// Creates a bad size request error.
    pub fn bad_size(message: impl Into<String>) -> Self {
        Self::BadSizeRequest {
            message: message.into(),
        }
    }

    /// Creates a truncation error.
    #[must_use]
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated {
            needed: needed as u64,
            available: available as u64,
        }
    }

    /// Returns the error class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        use evio_codec::CodecError;
        use evio_storage::StorageError;

        match self {
            Self::Storage(StorageError::ReadPastEnd { .. }) => ErrorKind::UnexpectedEnd,
            Self::Storage(StorageError::CapacityExceeded { .. }) => ErrorKind::Truncation,
            Self::Storage(StorageError::Unsupported { .. }) => ErrorKind::BadMode,
            Self::Storage(StorageError::Closed) => ErrorKind::BadHandle,
            Self::Storage(StorageError::Io(_)) | Self::Io(_) => ErrorKind::Storage,
            Self::Codec(CodecError::Format(_)) => ErrorKind::Format,
            Self::Codec(CodecError::Truncated { .. }) => ErrorKind::UnexpectedEnd,
            Self::Codec(_) => ErrorKind::BadFile,
            Self::BadArgument { .. } => ErrorKind::BadArgument,
            Self::BadHandle { .. } => ErrorKind::BadHandle,
            Self::BadMode { .. } => ErrorKind::BadMode,
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            Self::BadFile { .. } => ErrorKind::BadFile,
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::UnexpectedEnd { .. } => ErrorKind::UnexpectedEnd,
            Self::Truncated { .. } => ErrorKind::Truncation,
            Self::BadSizeRequest { .. } => ErrorKind::BadSizeRequest,
            Self::UnknownOption { .. } => ErrorKind::UnknownOption,
            Self::BadBlock { .. } => ErrorKind::BadBlock,
        }
    }
}
