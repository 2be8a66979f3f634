//! Block I/O.
//!
//! A stream is a sequence of blocks, each an 8-word (or larger) header
//! followed by whole events. Version 4 streams end with a block whose
//! last-block flag is set; writers always leave an empty one behind.
//!
//! ## Block Header Format
//!
//! ```text
//! | size | number | header words | count | reserved | version+flags | reserved | 0xc0da0100 |
//! ```

mod cursor;
mod header;
mod layout;
mod reader;
mod scan;

pub use cursor::BlockCursor;
pub(crate) use header::slot;
pub use header::{
    version_word, BlockHeader, CURRENT_VERSION, DICTIONARY_BIT, LAST_BLOCK_BIT, MAGIC,
};
pub(crate) use header::raw_words;
pub use layout::{layout_for, BlockLayout, LegacyLayout, ModernLayout};
pub use reader::{BlockReader, Events};
pub use scan::{scan_blocks, BlockScan, ScannedBlock};
