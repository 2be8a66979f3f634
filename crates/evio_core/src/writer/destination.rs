//! Where flushed blocks go.

use super::naming::NameTemplate;
use crate::error::{EvioError, EvioResult};
use evio_storage::{
    BackendKind, FileBackend, InMemoryBackend, SocketBackend, StorageBackend, StorageError,
};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

/// Output files named from a template and created on first use.
#[derive(Debug)]
pub(crate) struct FileOutput {
    template: Option<NameTemplate>,
    split: bool,
    split_number: u32,
    run_number: u32,
    run_type: Option<String>,
    current: Option<FileBackend>,
    created: Vec<PathBuf>,
    closed_bytes: u64,
}

impl FileOutput {
    fn open_current(&mut self) -> EvioResult<&mut FileBackend> {
        if self.current.is_none() {
            let backend = self.create_next()?;
            self.current = Some(backend);
        }
        self.current.as_mut().ok_or(EvioError::Storage(StorageError::Closed))
    }

    fn create_next(&mut self) -> EvioResult<FileBackend> {
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| EvioError::bad_mode("appended output cannot open new files"))?;
        let split = self.split.then_some(self.split_number);
        let path = template.render(self.run_number, split, self.run_type.as_deref());

        let backend = if self.split {
            self.split_number += 1;
            FileBackend::create_new(&path).map_err(|e| match e {
                StorageError::Io(io) if io.kind() == IoErrorKind::AlreadyExists => {
                    EvioError::bad_argument(format!(
                        "refusing to overwrite existing file {}",
                        path.display()
                    ))
                }
                other => other.into(),
            })?
        } else {
            FileBackend::create(&path)?
        };

        tracing::info!(path = %path.display(), split = ?split, "created output file");
        self.created.push(path);
        Ok(backend)
    }
}

/// The backend a writer flushes into.
#[derive(Debug)]
pub(crate) enum Destination {
    File(FileOutput),
    Buffer(InMemoryBackend),
    Socket(SocketBackend),
}

impl Destination {
    pub fn files(template: NameTemplate, split: bool, run_number: u32) -> Self {
        Self::File(FileOutput {
            template: Some(template),
            split,
            split_number: 0,
            run_number,
            run_type: None,
            current: None,
            created: Vec::new(),
            closed_bytes: 0,
        })
    }

    /// An already-open file that is written in place.
    pub fn existing_file(path: &Path, backend: FileBackend) -> Self {
        Self::File(FileOutput {
            template: None,
            split: false,
            split_number: 0,
            run_number: 1,
            run_type: None,
            current: Some(backend),
            created: vec![path.to_path_buf()],
            closed_bytes: 0,
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::File(_) => BackendKind::File,
            Self::Buffer(_) => BackendKind::Memory,
            Self::Socket(_) => BackendKind::Socket,
        }
    }

    pub fn backend(&mut self) -> EvioResult<&mut dyn StorageBackend> {
        let backend: &mut dyn StorageBackend = match self {
            Self::File(output) => output.open_current()?,
            Self::Buffer(buffer) => buffer,
            Self::Socket(socket) => socket,
        };
        Ok(backend)
    }

    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> EvioResult<()> {
        self.backend()?.write_at(offset, bytes)?;
        Ok(())
    }

    /// Capacity of a fixed-size buffer target.
    pub fn capacity(&self) -> Option<u64> {
        match self {
            Self::Buffer(buffer) => buffer.capacity_limit(),
            Self::File(_) | Self::Socket(_) => None,
        }
    }

    /// Syncs and closes the current file so the next write opens a new one.
    pub fn next_file(&mut self) -> EvioResult<()> {
        if let Self::File(output) = self {
            if let Some(mut backend) = output.current.take() {
                backend.sync()?;
                output.closed_bytes += backend.size()?;
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> EvioResult<()> {
        match self {
            Self::File(output) => {
                if let Some(backend) = output.current.as_mut() {
                    backend.sync()?;
                }
            }
            Self::Socket(socket) => {
                socket.flush()?;
                socket.shutdown_write()?;
            }
            Self::Buffer(_) => {}
        }
        Ok(())
    }

    /// Bytes held by every file written so far, or sent on the socket.
    pub fn bytes_written(&self) -> EvioResult<u64> {
        Ok(match self {
            Self::File(output) => {
                let current = match &output.current {
                    Some(backend) => backend.size()?,
                    None => 0,
                };
                output.closed_bytes + current
            }
            Self::Buffer(buffer) => buffer.size()?,
            Self::Socket(socket) => socket.size()?,
        })
    }

    pub fn set_run_number(&mut self, run: u32) {
        if let Self::File(output) = self {
            output.run_number = run;
        }
    }

    pub fn set_run_type(&mut self, run_type: &str) {
        if let Self::File(output) = self {
            output.run_type = Some(run_type.to_owned());
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::File(output) => &output.created,
            Self::Buffer(_) | Self::Socket(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn files_created_lazily() {
        let dir = tempdir().unwrap();
        let template = NameTemplate::parse(&format!("{}/out_%d.evio", dir.path().display())).unwrap();
        let mut dest = Destination::files(template, false, 3);
        assert!(dest.paths().is_empty());
        assert_eq!(dest.bytes_written().unwrap(), 0);

        dest.write_at(0, b"abcd").unwrap();
        assert_eq!(dest.paths(), [dir.path().join("out_3.evio")]);
        assert_eq!(dest.bytes_written().unwrap(), 4);
    }

    #[test]
    fn split_files_are_numbered_and_never_overwritten() {
        let dir = tempdir().unwrap();
        let template = NameTemplate::parse(&format!("{}/run.evio", dir.path().display())).unwrap();
        let mut dest = Destination::files(template.clone(), true, 1);
        dest.write_at(0, b"one").unwrap();
        dest.next_file().unwrap();
        dest.write_at(0, b"two!").unwrap();
        assert_eq!(
            dest.paths(),
            [dir.path().join("run.evio.0"), dir.path().join("run.evio.1")]
        );
        assert_eq!(dest.bytes_written().unwrap(), 7);

        let mut again = Destination::files(template, true, 1);
        assert!(matches!(
            again.write_at(0, b"x"),
            Err(EvioError::BadArgument { .. })
        ));
    }

    #[test]
    fn buffer_capacity_reported() {
        let dest = Destination::Buffer(InMemoryBackend::with_capacity_limit(64));
        assert_eq!(dest.capacity(), Some(64));
        assert_eq!(dest.kind(), BackendKind::Memory);
    }
}
