//! Block headers.
//!
//! ```text
//! | size | number | header words | count | reserved | version+flags | reserved | magic |
//! ```
//!
//! The version word packs the format version in its low 8 bits, the
//! dictionary flag at `0x100`, the last-block flag at `0x200` and a 4-bit
//! event type starting at bit 10.

use crate::config::HEADER_WORDS;
use crate::error::{EvioError, EvioResult};

/// Magic word in the last header slot.
pub const MAGIC: u32 = 0xc0da_0100;

/// Format version written by this library.
pub const CURRENT_VERSION: u32 = 4;

/// Version-word bit set when the block starts with a dictionary event.
pub const DICTIONARY_BIT: u32 = 0x100;

/// Version-word bit set on the terminal block of a stream.
pub const LAST_BLOCK_BIT: u32 = 0x200;

const VERSION_MASK: u32 = 0xff;
const EVENT_TYPE_SHIFT: u32 = 10;

/// Header slots.
pub(crate) mod slot {
    pub const SIZE: usize = 0;
    pub const NUMBER: usize = 1;
    pub const HEADER_WORDS: usize = 2;
    pub const COUNT: usize = 3;
    pub const USED: usize = 4;
    pub const VERSION: usize = 5;
    pub const MAGIC: usize = 7;
}

/// Packs a version word.
#[must_use]
pub const fn version_word(version: u32, dictionary: bool, last: bool, event_type: u32) -> u32 {
    let mut word = (version & VERSION_MASK) | ((event_type & 0xf) << EVENT_TYPE_SHIFT);
    if dictionary {
        word |= DICTIONARY_BIT;
    }
    if last {
        word |= LAST_BLOCK_BIT;
    }
    word
}

/// An 8-word block header in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    words: [u32; HEADER_WORDS],
}

impl BlockHeader {
    /// Creates an open (non-last) current-version header with no events.
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self {
            words: [
                HEADER_WORDS as u32,
                number,
                HEADER_WORDS as u32,
                0,
                0,
                version_word(CURRENT_VERSION, false, false, 0),
                0,
                MAGIC,
            ],
        }
    }

    /// The empty terminal header every stream ends with.
    #[must_use]
    pub const fn empty_last(number: u32) -> Self {
        let mut header = Self::new(number);
        header.words[slot::VERSION] = version_word(CURRENT_VERSION, false, true, 0);
        header
    }

    /// Parses header words exactly as they appear in the stream.
    ///
    /// Returns the header in host order and whether the stream is byte
    /// swapped relative to the host.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadFile`] if the magic matches in neither order, the
    ///   version is zero or the header size is below 8 words
    /// - [`EvioError::UnsupportedVersion`] for versions above 4
    pub fn detect(raw: [u32; HEADER_WORDS]) -> EvioResult<(Self, bool)> {
        let swapped = if raw[slot::MAGIC] == MAGIC {
            false
        } else if raw[slot::MAGIC].swap_bytes() == MAGIC {
            true
        } else {
            return Err(EvioError::bad_file(format!(
                "magic number {:#010x} matches neither byte order",
                raw[slot::MAGIC]
            )));
        };
        let header = Self::from_stream(raw, swapped)?;
        Ok((header, swapped))
    }

    /// Parses header words from a stream of known byte order.
    ///
    /// # Errors
    ///
    /// As [`BlockHeader::detect`], plus a magic number that does not match
    /// the expected order.
    pub fn from_stream(mut raw: [u32; HEADER_WORDS], swapped: bool) -> EvioResult<Self> {
        if swapped {
            for word in &mut raw {
                *word = word.swap_bytes();
            }
        }
        let header = Self { words: raw };
        if header.magic() != MAGIC {
            return Err(EvioError::bad_file(format!(
                "block {} has magic number {:#010x}",
                header.number(),
                header.magic()
            )));
        }
        match header.version() {
            0 => return Err(EvioError::bad_file("block header has version 0")),
            v if v > CURRENT_VERSION => {
                return Err(EvioError::UnsupportedVersion { version: v });
            }
            _ => {}
        }
        if (header.header_words() as usize) < HEADER_WORDS {
            return Err(EvioError::bad_file(format!(
                "block header size {} is below {HEADER_WORDS} words",
                header.header_words()
            )));
        }
        if header.size() < header.header_words() {
            return Err(EvioError::bad_file(format!(
                "block size {} is smaller than its header ({})",
                header.size(),
                header.header_words()
            )));
        }
        Ok(header)
    }

    /// Parses raw stream bytes (at least 32).
    ///
    /// # Errors
    ///
    /// See [`BlockHeader::from_stream`].
    pub fn from_bytes(bytes: &[u8], swapped: bool) -> EvioResult<Self> {
        Self::from_stream(raw_words(bytes)?, swapped)
    }

    /// Header words in host order.
    #[must_use]
    pub const fn words(&self) -> [u32; HEADER_WORDS] {
        self.words
    }

    /// Host-order bytes of the header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_WORDS * 4] {
        let mut bytes = [0u8; HEADER_WORDS * 4];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.words) {
            chunk.copy_from_slice(&word.to_ne_bytes());
        }
        bytes
    }

    /// Block size in words, header included.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.words[slot::SIZE]
    }

    /// Block sequence number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.words[slot::NUMBER]
    }

    /// Header size in words.
    #[must_use]
    pub const fn header_words(&self) -> u32 {
        self.words[slot::HEADER_WORDS]
    }

    /// Event count (version 4) or first-event offset (versions 1 to 3).
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.words[slot::COUNT]
    }

    /// Words in use (versions 1 to 3).
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.words[slot::USED]
    }

    /// Format version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.words[slot::VERSION] & VERSION_MASK
    }

    /// Event type carried in the version word.
    #[must_use]
    pub const fn event_type(&self) -> u32 {
        (self.words[slot::VERSION] >> EVENT_TYPE_SHIFT) & 0xf
    }

    /// Returns true if the block starts with a dictionary event.
    #[must_use]
    pub const fn has_dictionary(&self) -> bool {
        self.words[slot::VERSION] & DICTIONARY_BIT != 0
    }

    /// Returns true for the terminal block (version 4 only).
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.version() >= CURRENT_VERSION && self.words[slot::VERSION] & LAST_BLOCK_BIT != 0
    }

    /// Magic word.
    #[must_use]
    pub const fn magic(&self) -> u32 {
        self.words[slot::MAGIC]
    }

    /// Payload words (block size minus header size).
    #[must_use]
    pub const fn payload_words(&self) -> u32 {
        self.size().saturating_sub(self.header_words())
    }

    pub(crate) fn set_last(&mut self, last: bool) {
        if last {
            self.words[slot::VERSION] |= LAST_BLOCK_BIT;
        } else {
            self.words[slot::VERSION] &= !LAST_BLOCK_BIT;
        }
    }
}

pub(crate) fn raw_words(bytes: &[u8]) -> EvioResult<[u32; HEADER_WORDS]> {
    if bytes.len() < HEADER_WORDS * 4 {
        return Err(EvioError::unexpected_end(format!(
            "block header needs {} bytes, found {}",
            HEADER_WORDS * 4,
            bytes.len()
        )));
    }
    let mut raw = [0u32; HEADER_WORDS];
    for (word, chunk) in raw.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(raw)
}
