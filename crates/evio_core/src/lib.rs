//! # EVIO Core
//!
//! Reading, writing and indexing EVIO event streams.
//!
//! A stream is a sequence of blocks, each holding whole events. Streams
//! live in files, memory buffers or TCP sockets and may be written in
//! either byte order; readers detect the order from the block magic number
//! and hand out events in host order.
//!
//! ## Design Principles
//!
//! - **Explicit registry**: sessions live in a [`Registry`] value owned by
//!   the caller and are addressed by [`Handle`]s
//! - **Always terminated**: after every write the output ends in an empty
//!   last block, so a stream cut off after any write is still readable
//! - **Bounds checked**: every declared length is checked against the data
//!   that holds it before it is followed
//! - **Blocking I/O**: nothing is retried except interrupted socket reads
//!
//! ## Available Modules
//!
//! - [`block`]: block headers, layouts and the sequential reader
//! - [`writer`]: block accumulation, flushing, splitting and file naming
//! - [`random`]: memory-mapped event index
//! - [`dictionary`]: dictionary events
//! - [`registry`]: handle table and locking
//!
//! ## Example
//!
//! ```
//! use evio_core::{Registry, InMemoryBackend};
//!
//! let registry = Registry::new();
//! let buffer = InMemoryBackend::new();
//!
//! let out = registry.open(buffer.clone(), "wb").unwrap();
//! registry.write(out, &[2, 0x0001_0100, 7, 8]).unwrap();
//! registry.close(out).unwrap();
//!
//! let input = registry.open(buffer, "rb").unwrap();
//! assert_eq!(registry.read_alloc(input).unwrap(), Some(vec![2, 0x0001_0100, 7, 8]));
//! assert_eq!(registry.read_alloc(input).unwrap(), None);
//! registry.close(input).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod block;
mod config;
mod control;
pub mod dictionary;
mod error;
mod mode;
pub mod random;
pub mod registry;
mod session;
pub mod writer;

pub use block::{BlockHeader, BlockReader};
pub use config::{
    OpenOptions, SequencePolicy, DEFAULT_BLOCK_EVENTS, DEFAULT_BLOCK_WORDS, DEFAULT_SPLIT_BYTES,
    HEADER_WORDS, MAX_BLOCK_EVENTS, MAX_BLOCK_WORDS, MIN_BLOCK_WORDS, MIN_BUFFER_BYTES,
    MIN_SPLIT_BYTES,
};
pub use control::{Control, ControlReply};
pub use error::{ErrorKind, EvioError, EvioResult};
pub use evio_storage::{BackendKind, InMemoryBackend};
pub use mode::{Mode, OpenFlags, Target};
pub use random::{EventLocation, EventStore, EventView};
pub use registry::{Handle, Registry};
pub use session::Session;
pub use writer::{EventWriter, NameTemplate};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
