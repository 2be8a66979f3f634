//! One open stream and the operations allowed on it.

use crate::block::{BlockReader, CURRENT_VERSION};
use crate::config::{OpenOptions, MIN_BUFFER_BYTES};
use crate::control::{Control, ControlReply};
use crate::error::{EvioError, EvioResult};
use crate::mode::{Mode, OpenFlags, Target};
use crate::random::{EventLocation, EventStore, EventView};
use crate::writer::EventWriter;
use evio_storage::{FileBackend, InMemoryBackend, SocketBackend, StorageBackend};
use std::path::Path;
use std::sync::Arc;

enum Kind {
    Reader(BlockReader),
    Writer(EventWriter),
    Random(Arc<EventStore>),
}

/// An open stream: a sequential reader, a writer or a random-access index.
pub struct Session {
    flags: OpenFlags,
    kind: Kind,
}

impl Session {
    /// Opens `target` as described by `flags`.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadArgument`] if the target does not fit the mode, or
    ///   a buffer is smaller than 44 bytes for reading or appending
    /// - any error of the underlying reader, writer or index
    pub fn open(target: Target, flags: OpenFlags, options: &OpenOptions) -> EvioResult<Self> {
        target.check(flags)?;
        let kind = match (flags.mode, target) {
            (Mode::Read, Target::File(path)) => {
                let backend = FileBackend::open_read(&path)?;
                Kind::Reader(BlockReader::open(Box::new(backend), options.sequence_policy)?)
            }
            (Mode::Read, Target::Buffer(buffer)) => {
                check_buffer(&buffer)?;
                Kind::Reader(BlockReader::open(Box::new(buffer), options.sequence_policy)?)
            }
            (Mode::Read, Target::Socket(stream)) => {
                let backend = SocketBackend::new(stream);
                Kind::Reader(BlockReader::open(Box::new(backend), options.sequence_policy)?)
            }
            (Mode::Write, Target::File(path)) => {
                Kind::Writer(EventWriter::create_file(utf8(&path)?, flags.split, options)?)
            }
            (Mode::Write, Target::Buffer(buffer)) => {
                Kind::Writer(EventWriter::create_buffer(buffer, options)?)
            }
            (Mode::Write, Target::Socket(stream)) => {
                Kind::Writer(EventWriter::create_socket(SocketBackend::new(stream), options)?)
            }
            (Mode::Append, Target::File(path)) => {
                Kind::Writer(EventWriter::append_file(&path, options)?)
            }
            (Mode::Append, Target::Buffer(buffer)) => {
                check_buffer(&buffer)?;
                Kind::Writer(EventWriter::append_buffer(buffer, options)?)
            }
            (Mode::RandomAccess, Target::File(path)) => {
                let backend = FileBackend::open_read(&path)?;
                Kind::Random(Arc::new(EventStore::open_file(&backend)?))
            }
            (Mode::RandomAccess, Target::Buffer(buffer)) => {
                Kind::Random(Arc::new(EventStore::open_buffer(&buffer)?))
            }
            (Mode::Append | Mode::RandomAccess, Target::Socket(_)) => {
                return Err(EvioError::bad_argument(format!(
                    "sockets cannot be opened for {flags}"
                )));
            }
        };
        tracing::info!(mode = %flags, "opened session");
        Ok(Self { flags, kind })
    }

    /// How the session was opened.
    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    fn reader(&mut self) -> EvioResult<&mut BlockReader> {
        let flags = self.flags;
        match &mut self.kind {
            Kind::Reader(reader) => Ok(reader),
            _ => Err(wrong_mode(flags, "sequential reading")),
        }
    }

    fn writer(&mut self) -> EvioResult<&mut EventWriter> {
        let flags = self.flags;
        match &mut self.kind {
            Kind::Writer(writer) => Ok(writer),
            _ => Err(wrong_mode(flags, "writing")),
        }
    }

    /// The random-access index of the session.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless opened for random access.
    pub fn store(&self) -> EvioResult<Arc<EventStore>> {
        match &self.kind {
            Kind::Random(store) => Ok(Arc::clone(store)),
            _ => Err(wrong_mode(self.flags, "random access")),
        }
    }

    /// Copies the next event into `buf`. See [`BlockReader::read_into`].
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless reading sequentially.
    pub fn read(&mut self, buf: &mut [u32]) -> EvioResult<Option<usize>> {
        self.reader()?.read_into(buf)
    }

    /// Reads the next event into a new vector.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless reading sequentially.
    pub fn read_alloc(&mut self) -> EvioResult<Option<Vec<u32>>> {
        self.reader()?.read_alloc()
    }

    /// Hands the next event to `f` without copying it.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless reading sequentially, or for
    /// streams older than version 4.
    pub fn read_no_copy<R>(&mut self, f: impl FnOnce(&[u32]) -> R) -> EvioResult<Option<R>> {
        self.reader()?.read_in_place(f)
    }

    /// View of event `number` (1-based).
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadMode`] unless opened for random access
    /// - [`EvioError::BadArgument`] if there is no such event
    pub fn read_random(&self, number: usize) -> EvioResult<EventView> {
        EventView::new(self.store()?, number)
    }

    /// A copy of the random-access table.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless opened for random access.
    pub fn event_table(&self) -> EvioResult<Vec<EventLocation>> {
        Ok(self.store()?.table().to_vec())
    }

    /// Writes one event.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless writing.
    pub fn write(&mut self, event: &[u32]) -> EvioResult<()> {
        self.writer()?.write(event)
    }

    /// Writes the dictionary.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless writing a fresh stream.
    pub fn write_dictionary(&mut self, xml: &str) -> EvioResult<()> {
        self.writer()?.write_dictionary(xml)
    }

    /// The stream's dictionary, if it has one.
    #[must_use]
    pub fn dictionary(&self) -> Option<String> {
        let xml = match &self.kind {
            Kind::Reader(reader) => reader.dictionary(),
            Kind::Writer(writer) => writer.dictionary(),
            Kind::Random(store) => store.dictionary(),
        };
        xml.map(str::to_owned)
    }

    /// Bytes written to the destination so far.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadMode`] unless writing.
    pub fn bytes_written(&mut self) -> EvioResult<u64> {
        self.writer()?.bytes_written()
    }

    /// Applies or answers a configuration request.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadMode`] for setters outside write mode, and for
    ///   requests the session kind cannot answer
    /// - validation errors from the writer
    pub fn control(&mut self, control: Control) -> EvioResult<ControlReply> {
        let flags = self.flags;
        let reply = match &mut self.kind {
            Kind::Writer(writer) => match control {
                Control::BlockSize(words) => writer.set_block_words(words).map(|()| ControlReply::Done)?,
                Control::BufferSize(words) => {
                    writer.set_buffer_words(words).map(|()| ControlReply::Done)?
                }
                Control::MaxEvents(events) => ControlReply::Applied(writer.set_max_block_events(events)?),
                Control::SplitSize(bytes) => writer.set_split_bytes(bytes).map(|()| ControlReply::Done)?,
                Control::RunNumber(run) => writer.set_run_number(run).map(|()| ControlReply::Done)?,
                Control::RunType(run_type) => {
                    writer.set_run_type(&run_type);
                    ControlReply::Done
                }
                Control::Version => ControlReply::Version(writer.version()),
                Control::Header => ControlReply::Header(writer.header().words()),
                Control::EventCount => ControlReply::EventCount(writer.event_count()?),
                Control::SequenceMismatches => {
                    return Err(wrong_mode(flags, "counting sequence mismatches"));
                }
            },
            Kind::Reader(reader) => match control {
                Control::Version => ControlReply::Version(reader.version()),
                Control::Header => ControlReply::Header(reader.header().words()),
                Control::EventCount => ControlReply::EventCount(reader.event_count()?),
                Control::SequenceMismatches => {
                    ControlReply::SequenceMismatches(reader.sequence_mismatches())
                }
                setter => return Err(wrong_mode(flags, &format!("{setter:?}"))),
            },
            Kind::Random(store) => match control {
                Control::Version => ControlReply::Version(store.header().version()),
                Control::Header => ControlReply::Header(store.header().words()),
                Control::EventCount => ControlReply::EventCount(store.len() as u64),
                other => return Err(wrong_mode(flags, &format!("{other:?}"))),
            },
        };
        Ok(reply)
    }

    /// Finishes the session, flushing a writer's remaining blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if a writer cannot flush.
    pub fn close(&mut self) -> EvioResult<()> {
        if let Kind::Writer(writer) = &mut self.kind {
            writer.close()?;
        }
        tracing::info!(mode = %self.flags, "closed session");
        Ok(())
    }

    /// Version of the stream being read, or written.
    #[must_use]
    pub fn version(&self) -> u32 {
        match &self.kind {
            Kind::Reader(reader) => reader.version(),
            Kind::Writer(_) => CURRENT_VERSION,
            Kind::Random(store) => store.header().version(),
        }
    }
}

fn wrong_mode(flags: OpenFlags, operation: &str) -> EvioError {
    EvioError::bad_mode(format!("{operation} is not allowed on a {flags} session"))
}

fn check_buffer(buffer: &InMemoryBackend) -> EvioResult<()> {
    let size = buffer.size()?;
    if size < MIN_BUFFER_BYTES as u64 {
        return Err(EvioError::bad_argument(format!(
            "buffer of {size} bytes is below the {MIN_BUFFER_BYTES}-byte minimum"
        )));
    }
    Ok(())
}

fn utf8(path: &Path) -> EvioResult<&str> {
    path.to_str().ok_or_else(|| {
        EvioError::bad_argument(format!("file name {} is not valid UTF-8", path.display()))
    })
}
