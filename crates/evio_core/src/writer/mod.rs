//! Event writer.
//!
//! Events accumulate in a [`BlockBuffer`](buffer) that always ends with an
//! empty last-block header. File and socket output is flushed when the
//! buffer fills; memory buffers are written through after every event.
//!
//! ## Flush Model
//!
//! `base` is the destination offset of the buffer's first word. A flush
//! writes the buffer at `base` and advances `base` to where its trailing
//! header landed, so the next flush overwrites that header in place.
//! Sockets cannot rewrite, so they receive the trailing header only when
//! the writer closes.

mod buffer;
mod destination;
mod naming;

pub use naming::NameTemplate;

use crate::block::{scan_blocks, BlockHeader, CURRENT_VERSION};
use crate::config::{
    OpenOptions, DEFAULT_BLOCK_EVENTS, DEFAULT_BLOCK_WORDS, DEFAULT_SPLIT_BYTES, HEADER_WORDS,
    MAX_BLOCK_EVENTS, MAX_BLOCK_WORDS, MIN_BLOCK_WORDS, MIN_SPLIT_BYTES,
};
use crate::dictionary::encode_dictionary;
use crate::error::{EvioError, EvioResult};
use buffer::BlockBuffer;
use destination::Destination;
use evio_storage::{
    BackendKind, FileBackend, InMemoryBackend, SocketBackend, StorageBackend,
};
use std::path::{Path, PathBuf};

/// Where appended events go in an existing stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AppendPosition {
    base: u64,
    next_number: u32,
    events: u64,
}

impl AppendPosition {
    /// Finds the end of an existing stream, clearing the last-block flag of
    /// a final block that holds events.
    fn locate(backend: &mut dyn StorageBackend) -> EvioResult<Self> {
        let scan = scan_blocks(backend)?;
        if scan.swapped {
            return Err(EvioError::bad_mode(
                "cannot append to a stream of the opposite byte order",
            ));
        }
        let version = scan.version();
        if version < CURRENT_VERSION {
            return Err(EvioError::UnsupportedVersion { version });
        }
        let last = *scan
            .last()
            .ok_or_else(|| EvioError::bad_file("stream has no blocks"))?;

        let mut header = last.header;
        let position = if header.payload_words() == 0 {
            Self {
                base: last.offset,
                next_number: header.number(),
                events: scan.event_count(),
            }
        } else {
            if header.is_last() {
                header.set_last(false);
                backend.write_at(last.offset, &header.to_bytes())?;
            }
            Self {
                base: last.end(),
                next_number: header.number().wrapping_add(1),
                events: scan.event_count(),
            }
        };
        Ok(position)
    }
}

/// Writes events into blocks on a file, socket or memory buffer.
pub struct EventWriter {
    dest: Destination,
    buffer: BlockBuffer,
    base: u64,
    block_words: u32,
    buffer_words: u32,
    max_block_events: u32,
    split_bytes: u64,
    split: bool,
    appending: bool,
    dictionary: Option<(String, Vec<u32>)>,
    events_written: u64,
    destination_events: u64,
    existing_events: u64,
    splits: u32,
}

impl EventWriter {
    fn with_destination(dest: Destination, split: bool, position: AppendPosition) -> Self {
        Self {
            dest,
            buffer: BlockBuffer::new(position.next_number),
            base: position.base,
            block_words: DEFAULT_BLOCK_WORDS,
            buffer_words: DEFAULT_BLOCK_WORDS + HEADER_WORDS as u32,
            max_block_events: DEFAULT_BLOCK_EVENTS,
            split_bytes: DEFAULT_SPLIT_BYTES,
            split,
            appending: false,
            dictionary: None,
            events_written: 0,
            destination_events: 0,
            existing_events: position.events,
            splits: 0,
        }
    }

    const FRESH: AppendPosition = AppendPosition {
        base: 0,
        next_number: 1,
        events: 0,
    };

    /// Writes to files named by `template`, split by size when `split` is
    /// set. Nothing is created until the first flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the template or an option is invalid.
    pub fn create_file(template: &str, split: bool, options: &OpenOptions) -> EvioResult<Self> {
        let template = NameTemplate::parse(template)?;
        let dest = Destination::files(template, split, options.run_number);
        let mut writer = Self::with_destination(dest, split, Self::FRESH);
        writer.apply_options(options)?;
        tracing::info!(split, "opened file writer");
        Ok(writer)
    }

    /// Writes into a memory buffer from its start.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::Truncated`] if a fixed-size buffer cannot hold an
    /// empty stream, or an error for an invalid option.
    pub fn create_buffer(buffer: InMemoryBackend, options: &OpenOptions) -> EvioResult<Self> {
        let mut writer = Self::with_destination(Destination::Buffer(buffer), false, Self::FRESH);
        writer.apply_options(options)?;
        writer.write_through(0)?;
        tracing::info!("opened buffer writer");
        Ok(writer)
    }

    /// Writes to a connected socket.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid option.
    pub fn create_socket(socket: SocketBackend, options: &OpenOptions) -> EvioResult<Self> {
        let mut writer = Self::with_destination(Destination::Socket(socket), false, Self::FRESH);
        writer.apply_options(options)?;
        tracing::info!("opened socket writer");
        Ok(writer)
    }

    /// Appends to an existing version 4 file.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadArgument`] if `path` is not a file
    /// - [`EvioError::BadMode`] if the file is in the opposite byte order
    /// - [`EvioError::UnsupportedVersion`] for versions before 4
    pub fn append_file(path: &Path, options: &OpenOptions) -> EvioResult<Self> {
        if !path.is_file() {
            return Err(EvioError::bad_argument(format!(
                "no stream at {} to append to",
                path.display()
            )));
        }
        let mut backend = FileBackend::open(path)?;
        let position = AppendPosition::locate(&mut backend)?;
        let mut writer =
            Self::with_destination(Destination::existing_file(path, backend), false, position);
        writer.appending = true;
        writer.apply_options(options)?;
        writer.write_through(0)?;
        tracing::info!(path = %path.display(), existing_events = position.events, "opened file for append");
        Ok(writer)
    }

    /// Appends to a version 4 stream held in a memory buffer.
    ///
    /// # Errors
    ///
    /// As [`EventWriter::append_file`], plus [`EvioError::Truncated`] if a
    /// fixed-size buffer has no room for the trailing header.
    pub fn append_buffer(mut buffer: InMemoryBackend, options: &OpenOptions) -> EvioResult<Self> {
        let position = AppendPosition::locate(&mut buffer)?;
        let mut writer = Self::with_destination(Destination::Buffer(buffer), false, position);
        writer.appending = true;
        writer.apply_options(options)?;
        writer.write_through(0)?;
        tracing::info!(existing_events = position.events, "opened buffer for append");
        Ok(writer)
    }

    fn apply_options(&mut self, options: &OpenOptions) -> EvioResult<()> {
        self.set_block_words(options.block_words)?;
        if self.dest.kind() != BackendKind::Memory {
            self.set_buffer_words(options.buffer_words)?;
        }
        self.set_max_block_events(options.max_block_events)?;
        self.set_split_bytes(options.split_bytes)?;
        self.set_run_number(options.run_number)?;
        if let Some(run_type) = &options.run_type {
            self.set_run_type(run_type);
        }
        Ok(())
    }

    /// Writes one event given as host-order words.
    ///
    /// Only the words covered by the event's declared length are written.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadArgument`] if the slice is shorter than the
    ///   declared length
    /// - [`EvioError::Truncated`] if a fixed-size buffer is full
    /// - storage errors from flushing or splitting
    pub fn write(&mut self, event: &[u32]) -> EvioResult<()> {
        let event = checked_event(event)?;
        let n = event.len();
        let mut new_block =
            self.buffer
                .starts_new_block(n, self.block_words, self.max_block_events);

        if self.split && self.destination_events > 0 {
            let projected = self.base + self.buffer.projected_words(n, new_block) as u64 * 4;
            if projected > self.split_bytes {
                self.split_destination()?;
                new_block = true;
            }
        }

        match self.dest.kind() {
            BackendKind::Memory => {
                self.check_capacity(n, new_block)?;
                if new_block && self.buffer.has_open_block() {
                    self.commit();
                }
            }
            BackendKind::File | BackendKind::Socket => {
                let projected = self.buffer.projected_words(n, new_block);
                if self.buffer.has_open_block() && projected > self.buffer_words as usize {
                    self.flush()?;
                    new_block = true;
                }
            }
        }

        let start = self.buffer.append(event, new_block);
        self.events_written += 1;
        self.destination_events += 1;
        if self.dest.kind() == BackendKind::Memory {
            self.write_through(start)?;
        }
        Ok(())
    }

    /// Writes the dictionary as the first event of the output.
    ///
    /// It is repeated at the head of every split file.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadMode`] when appending, or after any event
    /// - [`EvioError::BadArgument`] if `xml` is too short
    pub fn write_dictionary(&mut self, xml: &str) -> EvioResult<()> {
        if self.appending {
            return Err(EvioError::bad_mode("cannot add a dictionary when appending"));
        }
        if !self.is_pristine() {
            return Err(EvioError::bad_mode(
                "the dictionary must be written before any event",
            ));
        }
        let words = encode_dictionary(xml)?;
        if self.dest.kind() == BackendKind::Memory {
            self.check_capacity(words.len(), true)?;
        }
        let start = self.buffer.append_dictionary(&words);
        if self.dest.kind() == BackendKind::Memory {
            self.write_through(start)?;
        }
        self.dictionary = Some((xml.to_owned(), words));
        Ok(())
    }

    /// Writes buffered blocks to a file or socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be written.
    pub fn flush(&mut self) -> EvioResult<()> {
        let len = self.buffer.len();
        let end = match self.dest.kind() {
            BackendKind::File => len,
            BackendKind::Socket => len - HEADER_WORDS,
            BackendKind::Memory => 0,
        };
        if end > 0 {
            let bytes = self.buffer.bytes(0, end);
            self.dest.write_at(self.base, &bytes)?;
            tracing::debug!(
                offset = self.base,
                bytes = bytes.len(),
                next_block = self.buffer.next_number(),
                "flushed blocks"
            );
        }
        self.commit();
        Ok(())
    }

    /// Writes everything that remains, including the trailing header.
    ///
    /// A file writer that never received an event still produces a file
    /// holding one empty last block.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be written or synced.
    pub fn close(&mut self) -> EvioResult<()> {
        match self.dest.kind() {
            BackendKind::File => self.flush()?,
            BackendKind::Socket => {
                let bytes = self.buffer.bytes(0, self.buffer.len());
                self.dest.write_at(self.base, &bytes)?;
                self.base += bytes.len() as u64;
                self.buffer.reset(self.buffer.next_number());
            }
            BackendKind::Memory => {}
        }
        self.dest.finish()?;
        tracing::info!(
            events = self.events_written,
            bytes = self.bytes_written()?,
            splits = self.splits,
            "closed writer"
        );
        Ok(())
    }

    /// Sets the target block size in words.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadSizeRequest`] after the first write or for a
    /// size outside 256..=25,600,000.
    pub fn set_block_words(&mut self, words: u32) -> EvioResult<()> {
        self.ensure_pristine("block size")?;
        if !(MIN_BLOCK_WORDS..=MAX_BLOCK_WORDS).contains(&words) {
            return Err(EvioError::bad_size(format!(
                "block size {words} outside {MIN_BLOCK_WORDS}..={MAX_BLOCK_WORDS} words"
            )));
        }
        self.block_words = words;
        self.buffer_words = self.buffer_words.max(words + HEADER_WORDS as u32);
        Ok(())
    }

    /// Sets the write buffer size in words.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadMode`] for memory buffers
    /// - [`EvioError::BadSizeRequest`] after the first write, below the
    ///   block size plus a header, or above the largest block plus a header
    pub fn set_buffer_words(&mut self, words: u32) -> EvioResult<()> {
        if self.dest.kind() == BackendKind::Memory {
            return Err(EvioError::bad_mode(
                "buffer size applies to file and socket output",
            ));
        }
        self.ensure_pristine("buffer size")?;
        let min = self.block_words + HEADER_WORDS as u32;
        let max = MAX_BLOCK_WORDS + HEADER_WORDS as u32;
        if !(min..=max).contains(&words) {
            return Err(EvioError::bad_size(format!(
                "buffer size {words} outside {min}..={max} words"
            )));
        }
        self.buffer_words = words;
        Ok(())
    }

    /// Sets the maximum events per block and returns the value applied.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadSizeRequest`] for zero.
    pub fn set_max_block_events(&mut self, events: u32) -> EvioResult<u32> {
        if events == 0 {
            return Err(EvioError::bad_size("blocks must allow at least one event"));
        }
        self.max_block_events = events.min(MAX_BLOCK_EVENTS);
        Ok(self.max_block_events)
    }

    /// Sets the split threshold in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadSizeRequest`] below 72 bytes or below four
    /// times the buffer size in words.
    pub fn set_split_bytes(&mut self, bytes: u64) -> EvioResult<()> {
        let min = MIN_SPLIT_BYTES.max(4 * u64::from(self.buffer_words));
        if bytes < min {
            return Err(EvioError::bad_size(format!(
                "split size {bytes} is below {min} bytes"
            )));
        }
        self.split_bytes = bytes;
        Ok(())
    }

    /// Sets the run number used in file names.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadArgument`] for zero.
    pub fn set_run_number(&mut self, run: u32) -> EvioResult<()> {
        if run == 0 {
            return Err(EvioError::bad_argument("run numbers start at 1"));
        }
        self.dest.set_run_number(run);
        Ok(())
    }

    /// Sets the run type substituted for `%s` in file names.
    pub fn set_run_type(&mut self, run_type: &str) {
        self.dest.set_run_type(run_type);
    }

    /// Header of the block being filled.
    #[must_use]
    pub fn header(&self) -> BlockHeader {
        self.buffer.current_header()
    }

    /// Format version written.
    #[must_use]
    pub const fn version(&self) -> u32 {
        CURRENT_VERSION
    }

    /// Events in the output, including those already present when
    /// appending.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] for sockets.
    pub fn event_count(&self) -> EvioResult<u64> {
        if self.dest.kind() == BackendKind::Socket {
            return Err(EvioError::bad_mode("cannot count events on a socket"));
        }
        Ok(self.existing_events + self.events_written)
    }

    /// Bytes in the output so far.
    ///
    /// # Errors
    ///
    /// Returns an error if a file size cannot be read.
    pub fn bytes_written(&self) -> EvioResult<u64> {
        match self.dest.kind() {
            BackendKind::Memory => Ok(self.base + self.buffer.len() as u64 * 4),
            BackendKind::File | BackendKind::Socket => self.dest.bytes_written(),
        }
    }

    /// Dictionary text, if one was written.
    #[must_use]
    pub fn dictionary(&self) -> Option<&str> {
        self.dictionary.as_ref().map(|(xml, _)| xml.as_str())
    }

    /// Files created so far, in order.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        self.dest.paths()
    }

    /// Number of times the output was split.
    #[must_use]
    pub fn splits(&self) -> u32 {
        self.splits
    }

    /// Kind of the destination.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.dest.kind()
    }

    fn is_pristine(&self) -> bool {
        self.events_written == 0 && self.dictionary.is_none()
    }

    fn ensure_pristine(&self, what: &str) -> EvioResult<()> {
        if self.is_pristine() {
            Ok(())
        } else {
            Err(EvioError::bad_size(format!(
                "{what} cannot change after data has been written"
            )))
        }
    }

    fn check_capacity(&self, event_words: usize, new_block: bool) -> EvioResult<()> {
        if let Some(capacity) = self.dest.capacity() {
            let needed = self.base + self.buffer.projected_words(event_words, new_block) as u64 * 4;
            if needed > capacity {
                return Err(EvioError::Truncated {
                    needed: needed / 4,
                    available: capacity / 4,
                });
            }
        }
        Ok(())
    }

    /// Forgets buffered blocks that are already in the destination,
    /// keeping the trailing header.
    fn commit(&mut self) {
        let written = (self.buffer.len() - HEADER_WORDS) as u64 * 4;
        self.base += written;
        self.buffer.reset(self.buffer.next_number());
    }

    fn write_through(&mut self, from: usize) -> EvioResult<()> {
        let current = self.buffer.current_start();
        if self.buffer.has_open_block() && current < from {
            let header = self.buffer.bytes(current, current + HEADER_WORDS);
            self.dest.write_at(self.base + current as u64 * 4, &header)?;
        }
        let tail = self.buffer.bytes(from, self.buffer.len());
        self.dest.write_at(self.base + from as u64 * 4, &tail)
    }

    fn split_destination(&mut self) -> EvioResult<()> {
        self.flush()?;
        self.dest.next_file()?;
        self.base = 0;
        self.buffer.reset(1);
        self.destination_events = 0;
        self.splits += 1;
        if let Some((_, words)) = &self.dictionary {
            self.buffer.append_dictionary(words);
        }
        tracing::info!(splits = self.splits, "split output");
        Ok(())
    }
}

fn checked_event(event: &[u32]) -> EvioResult<&[u32]> {
    let Some(&length) = event.first() else {
        return Err(EvioError::bad_argument("event is empty"));
    };
    if length == 0 {
        return Err(EvioError::bad_argument("event declares no header word"));
    }
    let words = length as usize + 1;
    if words > event.len() {
        return Err(EvioError::bad_argument(format!(
            "event declares {words} words, slice holds {}",
            event.len()
        )));
    }
    Ok(&event[..words])
}
