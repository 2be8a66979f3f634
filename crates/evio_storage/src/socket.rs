//! Forward-only TCP stream backend.

use crate::backend::{BackendKind, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

/// A stream socket backend.
///
/// Sockets cannot seek: reads must ask for the next unread offset and writes
/// must target the next unwritten offset. Reads interrupted by a signal are
/// retried; nothing else is.
#[derive(Debug)]
pub struct SocketBackend {
    stream: TcpStream,
    read_pos: Mutex<u64>,
    write_pos: u64,
}

impl SocketBackend {
    /// Wraps a connected stream.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_pos: Mutex::new(0),
            write_pos: 0,
        }
    }

    /// Shuts down the write half so the peer sees end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub fn shutdown_write(&self) -> StorageResult<()> {
        self.stream.shutdown(Shutdown::Write)?;
        Ok(())
    }

    fn read_fully(&self, buffer: &mut [u8]) -> StorageResult<usize> {
        let mut got = 0;
        let mut reader = &self.stream;
        while got < buffer.len() {
            match reader.read(&mut buffer[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(got)
    }
}

impl StorageBackend for SocketBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Socket
    }

    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut pos = self.read_pos.lock();
        if offset != *pos {
            return Err(StorageError::unsupported(
                "socket",
                format!("read at offset {offset}, stream is at {}", *pos),
            ));
        }

        let mut buffer = vec![0u8; len];
        let got = self.read_fully(&mut buffer)?;
        *pos += got as u64;

        if got < len {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: offset + got as u64,
            });
        }
        Ok(buffer)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if offset != self.write_pos {
            return Err(StorageError::unsupported(
                "socket",
                format!("write at offset {offset}, stream is at {}", self.write_pos),
            ));
        }
        self.stream.write_all(data)?;
        self.write_pos += data.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.stream.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.write_pos + *self.read_pos.lock())
    }
}
