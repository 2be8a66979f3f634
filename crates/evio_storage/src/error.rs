//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    ///
    /// `size` is the number of bytes that actually exist. When it equals
    /// `offset` nothing at all was available at the requested position.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// A write would overflow a fixed-capacity buffer.
    #[error("buffer capacity exceeded: need {required} bytes, capacity {capacity}")]
    CapacityExceeded {
        /// Total bytes the write would require.
        required: u64,
        /// Fixed capacity of the buffer.
        capacity: u64,
    },

    /// The backend cannot perform the requested operation.
    #[error("unsupported operation on {backend} backend: {operation}")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// Description of the rejected operation.
        operation: String,
    },

    /// The storage is closed.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Creates an unsupported-operation error.
    pub fn unsupported(backend: &'static str, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            backend,
            operation: operation.into(),
        }
    }

    /// Returns true if this is a short read that found no bytes at all.
    #[must_use]
    pub fn is_clean_end(&self) -> bool {
        matches!(self, Self::ReadPastEnd { offset, size, .. } if offset == size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_end_detection() {
        let clean = StorageError::ReadPastEnd {
            offset: 64,
            len: 32,
            size: 64,
        };
        let short = StorageError::ReadPastEnd {
            offset: 64,
            len: 32,
            size: 80,
        };
        assert!(clean.is_clean_end());
        assert!(!short.is_clean_end());
        assert!(!StorageError::Closed.is_clean_end());
    }
}
