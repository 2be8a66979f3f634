//! Storage backend trait definition.

use crate::error::StorageResult;
use std::fmt;

/// The physical kind of a backend.
///
/// Capability checks in the codec match on this exhaustively, so adding a
/// kind forces every check to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// A regular file.
    File,
    /// A caller-visible memory buffer.
    Memory,
    /// A forward-only stream socket.
    Socket,
}

impl BackendKind {
    /// Returns true if the backend supports positional (non-sequential) access.
    #[must_use]
    pub const fn is_seekable(self) -> bool {
        match self {
            Self::File | Self::Memory => true,
            Self::Socket => false,
        }
    }

    /// Lower-case name used in errors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A low-level byte store for event streams.
///
/// Backends are **opaque byte stores**. They provide positional reads and
/// writes; the block format is owned entirely by the codec.
///
/// # Invariants
///
/// - `read_at` returns exactly `len` bytes or fails; a short read reports
///   [`crate::StorageError::ReadPastEnd`] with the number of bytes that exist
/// - `write_at` either writes all bytes or fails
/// - Forward-only backends accept reads and writes only at their current
///   position
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - Memory buffers
/// - [`super::FileBackend`] - Files
/// - [`super::SocketBackend`] - TCP streams
pub trait StorageBackend: Send + Sync {
    /// Returns the kind of this backend.
    fn kind(&self) -> BackendKind;

    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the available data
    /// - A forward-only backend is asked for a non-current offset
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` at `offset`, extending the store if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A fixed-capacity store would overflow
    /// - A forward-only backend is asked for a non-current offset
    /// - An I/O error occurs
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Appends data to the end of the store.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size()?;
        self.write_at(offset, data)?;
        Ok(offset)
    }

    /// Flushes all pending writes to the OS or the peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the store in bytes.
    ///
    /// For forward-only backends this is the number of bytes transferred so
    /// far.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seekable_kinds() {
        assert!(BackendKind::File.is_seekable());
        assert!(BackendKind::Memory.is_seekable());
        assert!(!BackendKind::Socket.is_seekable());
    }

    #[test]
    fn kind_display() {
        assert_eq!(BackendKind::Socket.to_string(), "socket");
        assert_eq!(BackendKind::Memory.to_string(), "memory");
    }
}
