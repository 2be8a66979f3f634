//! Sequential block reader.

use super::cursor::BlockCursor;
use super::header::{raw_words, BlockHeader};
use super::layout::{layout_for, BlockLayout};
use super::scan::scan_blocks;
use crate::config::{SequencePolicy, HEADER_WORDS};
use crate::dictionary::decode_dictionary;
use crate::error::{EvioError, EvioResult};
use evio_codec::swap::swap_words;
use evio_codec::{swap_event, SwapDirection};
use evio_storage::{BackendKind, StorageBackend, StorageError};

/// Reads events block by block from any backend.
///
/// Event words are handed out in host order. The reader holds one block at
/// a time; events of version 1 to 3 streams may continue into the next
/// block and are stitched together on copy.
pub struct BlockReader {
    backend: Box<dyn StorageBackend>,
    offset: u64,
    layout: &'static dyn BlockLayout,
    header: BlockHeader,
    cursor: BlockCursor,
    swapped: bool,
    at_last_block: bool,
    expected_number: u32,
    mismatches: u64,
    policy: SequencePolicy,
    dictionary: Option<String>,
    events_read: u64,
}

impl BlockReader {
    /// Opens a stream, reading its first block and any dictionary.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadFile`] if the first header is missing or malformed
    /// - [`EvioError::UnsupportedVersion`] for versions above 4
    /// - [`EvioError::UnexpectedEnd`] if the first block is cut short
    pub fn open(backend: Box<dyn StorageBackend>, policy: SequencePolicy) -> EvioResult<Self> {
        let raw = match backend.read_at(0, HEADER_WORDS * 4) {
            Ok(bytes) => bytes,
            Err(StorageError::ReadPastEnd { size, .. }) => {
                return Err(EvioError::bad_file(format!(
                    "stream of {size} bytes is shorter than a block header"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let (header, swapped) = BlockHeader::detect(raw_words(&raw)?)?;

        let mut reader = Self {
            backend,
            offset: (HEADER_WORDS * 4) as u64,
            layout: layout_for(header.version()),
            header,
            cursor: BlockCursor::new(),
            swapped,
            at_last_block: false,
            expected_number: header.number().wrapping_add(1),
            mismatches: 0,
            policy,
            dictionary: None,
            events_read: 0,
        };
        reader.load_block(header, true)?;

        if header.version() >= 4 && header.has_dictionary() {
            let words = reader
                .read_alloc()?
                .ok_or_else(|| EvioError::bad_file("dictionary flagged but no event present"))?;
            reader.events_read = 0;
            reader.dictionary = Some(decode_dictionary(&words)?);
        }

        tracing::debug!(
            backend = %reader.backend.kind(),
            version = header.version(),
            swapped,
            dictionary = reader.dictionary.is_some(),
            "opened stream for reading"
        );
        Ok(reader)
    }

    /// Copies the next event into `buf`.
    ///
    /// Returns the event length in words, or `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadArgument`] if `buf` holds fewer than 3 words
    /// - [`EvioError::Truncated`] if the event does not fit; the event is
    ///   not consumed
    /// - [`EvioError::UnexpectedEnd`] if the stream ends inside the event
    pub fn read_into(&mut self, buf: &mut [u32]) -> EvioResult<Option<usize>> {
        if buf.len() < 3 {
            return Err(EvioError::bad_argument(format!(
                "read buffer of {} words is too small",
                buf.len()
            )));
        }
        let Some(len) = self.peek_length()? else {
            return Ok(None);
        };
        if len > buf.len() {
            return Err(EvioError::truncated(len, buf.len()));
        }
        let event = &mut buf[..len];
        self.fill(event)?;
        self.to_local(event)?;
        self.events_read += 1;
        Ok(Some(len))
    }

    /// Reads the next event into a newly allocated buffer.
    ///
    /// # Errors
    ///
    /// As [`BlockReader::read_into`], plus [`EvioError::AllocationFailure`].
    pub fn read_alloc(&mut self) -> EvioResult<Option<Vec<u32>>> {
        let Some(len) = self.peek_length()? else {
            return Ok(None);
        };
        let mut event = Vec::new();
        event
            .try_reserve_exact(len)
            .map_err(|_| EvioError::AllocationFailure {
                bytes: len as u64 * 4,
            })?;
        event.resize(len, 0);
        self.fill(&mut event)?;
        self.to_local(&mut event)?;
        self.events_read += 1;
        Ok(Some(event))
    }

    /// Swaps the next event inside the block buffer and lends it to `f`.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadMode`] for streams before version 4
    /// - [`EvioError::UnexpectedEnd`] if the event overruns its block
    pub fn read_in_place<R>(&mut self, f: impl FnOnce(&[u32]) -> R) -> EvioResult<Option<R>> {
        if !self.layout.events_fit_blocks() {
            return Err(EvioError::bad_mode(format!(
                "in-place reads need version 4, stream is version {}",
                self.header.version()
            )));
        }
        let Some(len) = self.peek_length()? else {
            return Ok(None);
        };
        let swapped = self.swapped;
        let event = self.cursor.take_mut(len)?;
        if swapped {
            swap_event(event, SwapDirection::ToLocal)?;
        }
        self.events_read += 1;
        Ok(Some(f(event)))
    }

    /// Iterates over the remaining events.
    pub fn events(&mut self) -> Events<'_> {
        Events { reader: self }
    }

    /// Dictionary loaded at open, if any.
    #[must_use]
    pub fn dictionary(&self) -> Option<&str> {
        self.dictionary.as_deref()
    }

    /// Format version of the stream.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.header.version()
    }

    /// Header of the current block in host order.
    #[must_use]
    pub fn header(&self) -> BlockHeader {
        self.header
    }

    /// Returns true if the stream is in the opposite byte order.
    #[must_use]
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    /// Out-of-sequence block numbers seen so far.
    #[must_use]
    pub fn sequence_mismatches(&self) -> u64 {
        self.mismatches
    }

    /// Events handed out so far, dictionary excluded.
    #[must_use]
    pub fn events_read(&self) -> u64 {
        self.events_read
    }

    /// Kind of the underlying backend.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Total events in the stream, from a walk over every block header.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] for sockets and for streams whose
    /// headers carry no event counts (before version 4).
    pub fn event_count(&self) -> EvioResult<u64> {
        if !self.backend.kind().is_seekable() {
            return Err(EvioError::bad_mode("cannot count events on a socket"));
        }
        if !self.layout.counts_events() {
            return Err(EvioError::bad_mode(format!(
                "version {} headers carry no event counts",
                self.version()
            )));
        }
        Ok(scan_blocks(self.backend.as_ref())?.event_count())
    }

    fn peek_length(&mut self) -> EvioResult<Option<usize>> {
        while self.cursor.is_exhausted() {
            if !self.next_block()? {
                return Ok(None);
            }
        }
        let Some(first) = self.cursor.peek() else {
            return Ok(None);
        };
        let length = if self.swapped { first.swap_bytes() } else { first };
        Ok(Some(length as usize + 1))
    }

    fn fill(&mut self, dest: &mut [u32]) -> EvioResult<()> {
        let mut filled = 0;
        loop {
            let chunk = self.cursor.take_up_to(dest.len() - filled);
            dest[filled..filled + chunk.len()].copy_from_slice(chunk);
            filled += chunk.len();
            if filled == dest.len() {
                return Ok(());
            }
            if self.layout.events_fit_blocks() {
                return Err(EvioError::unexpected_end(format!(
                    "event of {} words overruns block {}",
                    dest.len(),
                    self.header.number()
                )));
            }
            if !self.next_block()? {
                return Err(EvioError::unexpected_end(format!(
                    "stream ended {} words into an event of {}",
                    filled,
                    dest.len()
                )));
            }
        }
    }

    fn to_local(&self, event: &mut [u32]) -> EvioResult<()> {
        if self.swapped {
            swap_event(event, SwapDirection::ToLocal)?;
        }
        Ok(())
    }

    fn next_block(&mut self) -> EvioResult<bool> {
        if self.at_last_block {
            return Ok(false);
        }
        let raw = match self.backend.read_at(self.offset, HEADER_WORDS * 4) {
            Ok(bytes) => bytes,
            Err(e) if e.is_clean_end() => return Ok(false),
            Err(StorageError::ReadPastEnd { offset, .. }) => {
                return Err(EvioError::unexpected_end(format!(
                    "block header at byte {offset} is cut short"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        self.offset += raw.len() as u64;

        let header = BlockHeader::from_bytes(&raw, self.swapped)?;
        self.check_sequence(&header)?;
        self.load_block(header, false)?;

        if self.cursor.is_exhausted() && !self.at_last_block {
            return Err(EvioError::unexpected_end(format!(
                "block {} holds no event data",
                header.number()
            )));
        }
        Ok(!self.cursor.is_exhausted())
    }

    fn check_sequence(&mut self, header: &BlockHeader) -> EvioResult<()> {
        let expected = self.expected_number;
        let found = header.number();
        self.expected_number = found.wrapping_add(1);
        if found == expected {
            return Ok(());
        }
        self.mismatches += 1;
        match self.policy {
            SequencePolicy::Record => {
                tracing::warn!(expected, found, "block number out of sequence");
                Ok(())
            }
            SequencePolicy::Abort => Err(EvioError::BadBlock { expected, found }),
        }
    }

    /// Reads the rest of a block whose 8 standard header words were
    /// already consumed.
    fn load_block(&mut self, header: BlockHeader, first: bool) -> EvioResult<()> {
        let total = header.size() as usize;
        let rest = total - HEADER_WORDS;

        if self.backend.kind().is_seekable() {
            let available = self.backend.size()?.saturating_sub(self.offset);
            if rest as u64 * 4 > available {
                return Err(EvioError::unexpected_end(format!(
                    "block {} needs {} bytes, {available} available",
                    header.number(),
                    rest * 4
                )));
            }
        }

        let mut words = Vec::new();
        words
            .try_reserve_exact(total)
            .map_err(|_| EvioError::AllocationFailure {
                bytes: total as u64 * 4,
            })?;
        words.extend_from_slice(&header.words());

        if rest > 0 {
            let bytes = match self.backend.read_at(self.offset, rest * 4) {
                Ok(bytes) => bytes,
                Err(StorageError::ReadPastEnd { size, .. }) => {
                    return Err(EvioError::unexpected_end(format!(
                        "block {} needs {} bytes, {} available",
                        header.number(),
                        rest * 4,
                        size.saturating_sub(self.offset)
                    )));
                }
                Err(e) => return Err(e.into()),
            };
            self.offset += bytes.len() as u64;
            words.extend(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]])),
            );
        }

        let header_words = header.header_words() as usize;
        if self.swapped && header_words > HEADER_WORDS {
            swap_words(&mut words[HEADER_WORDS..header_words]);
        }

        let span = self.layout.data_span(&header, first);
        self.cursor.load(words, span);
        self.header = header;
        self.at_last_block = self.layout.ends_stream(&header);
        Ok(())
    }
}

/// Iterator over the remaining events of a [`BlockReader`].
pub struct Events<'a> {
    reader: &'a mut BlockReader,
}

impl Iterator for Events<'_> {
    type Item = EvioResult<Vec<u32>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_alloc().transpose()
    }
}
