//! Random-access event index.
//!
//! A file is memory mapped (a memory buffer is copied) and walked once,
//! recording the position of every event. Streams in the opposite byte
//! order are swapped during that walk into a private copy-on-write map, so
//! lookups never mutate anything.

use crate::block::{BlockHeader, CURRENT_VERSION};
use crate::config::HEADER_WORDS;
use crate::dictionary::decode_dictionary;
use crate::error::{EvioError, EvioResult};
use evio_codec::{swap_event, SwapDirection};
use evio_storage::{FileBackend, InMemoryBackend, Mmap, MmapMut};
use std::sync::Arc;

/// Initial table capacity and growth step, in events.
const TABLE_STEP: usize = 10_000;

/// Where one event lives in the indexed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLocation {
    /// Byte offset of the event's first word.
    pub offset: usize,
    /// Event length in words, length word included.
    pub words: usize,
}

impl EventLocation {
    fn byte_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.words * 4
    }
}

#[derive(Debug)]
enum Backing {
    Mapped(Mmap),
    Private(MmapMut),
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => &map[..],
            Self::Private(map) => &map[..],
            Self::Owned(bytes) => bytes.as_slice(),
        }
    }

    fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Mapped(_) => None,
            Self::Private(map) => Some(&mut map[..]),
            Self::Owned(bytes) => Some(bytes.as_mut_slice()),
        }
    }
}

/// An indexed, read-only stream.
#[derive(Debug)]
pub struct EventStore {
    backing: Backing,
    table: Vec<EventLocation>,
    dictionary: Option<String>,
    header: BlockHeader,
    swapped: bool,
}

impl EventStore {
    /// Maps and indexes a file.
    ///
    /// # Errors
    ///
    /// As [`EventStore::from_bytes`], plus mapping failures.
    pub fn open_file(backend: &FileBackend) -> EvioResult<Self> {
        let map = backend.map()?;
        let (header, swapped) = detect_order(&map)?;
        let backing = if swapped {
            Backing::Private(backend.map_private()?)
        } else {
            Backing::Mapped(map)
        };
        Self::build(backing, header, swapped)
    }

    /// Indexes a copy of a memory buffer.
    ///
    /// # Errors
    ///
    /// As [`EventStore::from_bytes`].
    pub fn open_buffer(buffer: &InMemoryBackend) -> EvioResult<Self> {
        Self::from_bytes(buffer.data())
    }

    /// Indexes owned stream bytes.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadFile`] for a malformed header
    /// - [`EvioError::UnsupportedVersion`] for versions before 4
    /// - [`EvioError::UnexpectedEnd`] if a block or event is cut short
    pub fn from_bytes(bytes: Vec<u8>) -> EvioResult<Self> {
        let (header, swapped) = detect_order(&bytes)?;
        Self::build(Backing::Owned(bytes), header, swapped)
    }

    fn build(mut backing: Backing, header: BlockHeader, swapped: bool) -> EvioResult<Self> {
        let (table, dictionary) = index(backing.bytes(), swapped)?;
        if swapped {
            let bytes = backing
                .bytes_mut()
                .ok_or_else(|| EvioError::bad_mode("shared map cannot be swapped"))?;
            for location in &table {
                swap_in_place(&mut bytes[location.byte_range()])?;
            }
        }
        tracing::debug!(events = table.len(), swapped, "built event index");
        Ok(Self {
            backing,
            table,
            dictionary,
            header,
            swapped,
        })
    }

    /// Number of indexed events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if the stream holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The event table in stream order.
    #[must_use]
    pub fn table(&self) -> &[EventLocation] {
        &self.table
    }

    /// Dictionary of the stream, if any.
    #[must_use]
    pub fn dictionary(&self) -> Option<&str> {
        self.dictionary.as_deref()
    }

    /// Header of the first block, in host order.
    #[must_use]
    pub fn header(&self) -> BlockHeader {
        self.header
    }

    /// Returns true if the stream was in the opposite byte order.
    #[must_use]
    pub fn was_swapped(&self) -> bool {
        self.swapped
    }

    /// Host-order bytes of event `index` (0-based).
    #[must_use]
    pub fn event_bytes(&self, index: usize) -> Option<&[u8]> {
        let location = self.table.get(index)?;
        self.backing.bytes().get(location.byte_range())
    }
}

/// A borrowed-by-handle view of one indexed event.
///
/// The view keeps the index alive, so it stays valid after the session
/// that produced it is closed.
#[derive(Debug, Clone)]
pub struct EventView {
    store: Arc<EventStore>,
    index: usize,
}

impl EventView {
    /// Creates a view of event `number` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadArgument`] if no such event exists.
    pub fn new(store: Arc<EventStore>, number: usize) -> EvioResult<Self> {
        if number == 0 || number > store.len() {
            return Err(EvioError::bad_argument(format!(
                "event {number} outside 1..={}",
                store.len()
            )));
        }
        Ok(Self {
            store,
            index: number - 1,
        })
    }

    /// Event bytes in host order.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.store.event_bytes(self.index).unwrap_or_default()
    }

    /// Word `i` of the event.
    #[must_use]
    pub fn word(&self, i: usize) -> Option<u32> {
        let chunk = self.bytes().get(i * 4..i * 4 + 4)?;
        Some(u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    /// Event length in words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes().len() / 4
    }

    /// Returns true for an empty view.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Copies the event out as words.
    #[must_use]
    pub fn to_words(&self) -> Vec<u32> {
        bytes_to_words(self.bytes())
    }

    /// Location of the event in the stream.
    #[must_use]
    pub fn location(&self) -> EventLocation {
        self.store.table[self.index]
    }
}

fn detect_order(bytes: &[u8]) -> EvioResult<(BlockHeader, bool)> {
    let raw = crate::block::raw_words(bytes).map_err(|_| {
        EvioError::bad_file(format!(
            "stream of {} bytes is shorter than a block header",
            bytes.len()
        ))
    })?;
    let (header, swapped) = BlockHeader::detect(raw)?;
    if header.version() < CURRENT_VERSION {
        return Err(EvioError::UnsupportedVersion {
            version: header.version(),
        });
    }
    Ok((header, swapped))
}

fn read_word(bytes: &[u8], offset: usize, swapped: bool) -> EvioResult<u32> {
    let chunk = bytes.get(offset..offset + 4).ok_or_else(|| {
        EvioError::unexpected_end(format!("word at byte {offset} is past the end"))
    })?;
    let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    Ok(if swapped { word.swap_bytes() } else { word })
}

fn index(bytes: &[u8], swapped: bool) -> EvioResult<(Vec<EventLocation>, Option<String>)> {
    let mut table = Vec::with_capacity(TABLE_STEP);
    let mut dictionary = None;
    let mut offset = 0usize;
    let mut first = true;

    while offset < bytes.len() {
        let left = bytes.len() - offset;
        if left < HEADER_WORDS * 4 {
            return Err(EvioError::unexpected_end(format!(
                "{left} bytes after the last block"
            )));
        }
        let header = BlockHeader::from_bytes(&bytes[offset..], swapped)?;
        let block_end = offset + header.size() as usize * 4;
        if block_end > bytes.len() {
            return Err(EvioError::unexpected_end(format!(
                "block {} overruns the stream",
                header.number()
            )));
        }

        let mut pos = offset + header.header_words() as usize * 4;
        if first && header.has_dictionary() {
            let words = read_word(bytes, pos, swapped)? as usize + 1;
            let end = pos + words * 4;
            if end > block_end {
                return Err(EvioError::unexpected_end("dictionary overruns its block"));
            }
            let mut dict = bytes_to_words(&bytes[pos..end]);
            if swapped {
                swap_event(&mut dict, SwapDirection::ToLocal)?;
            }
            dictionary = Some(decode_dictionary(&dict)?);
            pos = end;
        }

        for _ in 0..header.count() {
            let words = read_word(bytes, pos, swapped)? as usize + 1;
            let location = EventLocation { offset: pos, words };
            if location.byte_range().end > block_end {
                return Err(EvioError::unexpected_end(format!(
                    "event at byte {pos} overruns block {}",
                    header.number()
                )));
            }
            if table.len() == table.capacity() {
                table.reserve_exact(TABLE_STEP);
            }
            table.push(location);
            pos = location.byte_range().end;
        }

        first = false;
        offset = block_end;
        if header.is_last() {
            break;
        }
    }
    Ok((table, dictionary))
}

fn swap_in_place(bytes: &mut [u8]) -> EvioResult<()> {
    let mut words = bytes_to_words(bytes);
    swap_event(&mut words, SwapDirection::ToLocal)?;
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    Ok(())
}

fn bytes_to_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
