//! # EVIO Storage
//!
//! Byte-store backends for the EVIO codec.
//!
//! Backends are **opaque byte stores** - they know nothing about blocks,
//! events or byte order. The codec layers above own all format
//! interpretation.
//!
//! ## Design Principles
//!
//! - Backends are positional byte stores (read at, write at, flush)
//! - Every backend reports its [`BackendKind`] so callers can check
//!   capabilities exhaustively
//! - Must be `Send + Sync` for concurrent access
//! - A read that stops short at the end of data reports
//!   [`StorageError::ReadPastEnd`] with the real size, so callers can tell a
//!   clean end of stream from a truncated record
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - Caller-visible memory buffer, optionally fixed-size
//! - [`FileBackend`] - OS files, with read-only and private memory maps
//! - [`SocketBackend`] - Forward-only TCP stream
//!
//! ## Example
//!
//! ```rust
//! use evio_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_at(0, b"hello world").unwrap();
//! let data = backend.read_at(6, 5).unwrap();
//! assert_eq!(&data, b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod socket;

pub use backend::{BackendKind, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use socket::SocketBackend;

/// Re-exported map types handed out by [`FileBackend::map`] and
/// [`FileBackend::map_private`].
pub use memmap2::{Mmap, MmapMut};
