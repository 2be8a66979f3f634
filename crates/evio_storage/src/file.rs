//! File-based backend.

use crate::backend::{BackendKind, StorageBackend};
use crate::error::{StorageError, StorageResult};
use memmap2::{Mmap, MmapMut, MmapOptions};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based backend.
///
/// # Durability
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
///
/// # Memory maps
///
/// [`FileBackend::map`] returns a shared read-only view of the file and
/// [`FileBackend::map_private`] a copy-on-write view whose changes never
/// reach the file. Both are only valid while nobody truncates the file.
///
/// # Example
///
/// ```no_run
/// use evio_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::create(Path::new("run.evio")).unwrap();
/// backend.write_at(0, b"block data").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
    writable: bool,
}

impl FileBackend {
    /// Opens or creates a file for reading and writing without truncating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(path, file, true)
    }

    /// Opens an existing file for reading only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open_read(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Self::from_file(path, file, false)
    }

    /// Creates a file for writing, truncating any existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::from_file(path, file, true)
    }

    /// Creates a new file, failing if one already exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an `AlreadyExists` I/O error if the file exists, or any other
    /// error from creating it.
    pub fn create_new(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Self::from_file(path, file, true)
    }

    fn from_file(path: &Path, file: File, writable: bool) -> StorageResult<Self> {
        let size = file.metadata()?.len();
        tracing::debug!(path = %path.display(), size, writable, "opened file backend");

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
            writable,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maps the whole file read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is empty or the map fails.
    #[allow(unsafe_code)]
    pub fn map(&self) -> StorageResult<Mmap> {
        self.ensure_mappable()?;
        let file = self.file.read();
        // SAFETY: the map is only read; callers must not truncate the file
        // while the map is alive.
        let map = unsafe { MmapOptions::new().map(&*file)? };
        Ok(map)
    }

    /// Maps the whole file copy-on-write.
    ///
    /// Writes through the returned map stay private to this process and are
    /// never written back to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is empty or the map fails.
    #[allow(unsafe_code)]
    pub fn map_private(&self) -> StorageResult<MmapMut> {
        self.ensure_mappable()?;
        let file = self.file.read();
        // SAFETY: a private mapping never writes back; callers must not
        // truncate the file while the map is alive.
        let map = unsafe { MmapOptions::new().map_copy(&*file)? };
        Ok(map)
    }

    fn ensure_mappable(&self) -> StorageResult<()> {
        if *self.size.read() == 0 {
            return Err(StorageError::ReadPastEnd {
                offset: 0,
                len: 1,
                size: 0,
            });
        }
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::unsupported("file", "write to read-only file"));
        }
        if data.is_empty() {
            return Ok(());
        }

        let mut file = self.file.write();
        let mut size = self.size.write();

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        *size = (*size).max(offset + data.len() as u64);

        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut file = self.file.write();
        file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn sync(&mut self) -> StorageResult<()> {
        if !self.writable {
            return Ok(());
        }
        let file = self.file.write();
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");

        let backend = FileBackend::create(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(backend.kind(), BackendKind::File);
        assert!(path.exists());
    }

    #[test]
    fn file_append_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");

        let mut backend = FileBackend::open(&path).unwrap();

        let offset1 = backend.append(b"hello").unwrap();
        assert_eq!(offset1, 0);

        let offset2 = backend.append(b" world").unwrap();
        assert_eq!(offset2, 5);

        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(&backend.read_at(0, 11).unwrap(), b"hello world");
    }

    #[test]
    fn file_write_at_overwrites_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");

        let mut backend = FileBackend::create(&path).unwrap();
        backend.write_at(0, b"aaaaTAIL").unwrap();
        backend.write_at(4, b"bbbbcccc").unwrap();

        assert_eq!(backend.size().unwrap(), 12);
        assert_eq!(&backend.read_at(0, 12).unwrap(), b"aaaabbbbcccc");
    }

    #[test]
    fn file_read_past_end_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"hello").unwrap();

        let result = backend.read_at(3, 5);
        assert!(matches!(
            result,
            Err(StorageError::ReadPastEnd { size: 5, .. })
        ));
        assert!(backend.read_at(5, 8).unwrap_err().is_clean_end());
    }

    #[test]
    fn file_create_new_refuses_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");
        std::fs::write(&path, b"existing").unwrap();

        let result = FileBackend::create_new(&path);
        match result {
            Err(StorageError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::AlreadyExists),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn file_read_only_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");
        std::fs::write(&path, b"data").unwrap();

        let mut backend = FileBackend::open_read(&path).unwrap();
        assert!(matches!(
            backend.write_at(0, b"x"),
            Err(StorageError::Unsupported { .. })
        ));
        assert_eq!(&backend.read_at(0, 4).unwrap(), b"data");
    }

    #[test]
    fn file_map_sees_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");
        std::fs::write(&path, b"mapped bytes").unwrap();

        let backend = FileBackend::open_read(&path).unwrap();
        let map = backend.map().unwrap();
        assert_eq!(&map[..], b"mapped bytes");
    }

    #[test]
    fn file_private_map_does_not_write_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");
        std::fs::write(&path, b"original").unwrap();

        let backend = FileBackend::open_read(&path).unwrap();
        let mut map = backend.map_private().unwrap();
        map[0..4].copy_from_slice(b"XXXX");
        assert_eq!(&map[..], b"XXXXinal");
        drop(map);

        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn file_map_empty_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.evio");
        let backend = FileBackend::create(&path).unwrap();
        assert!(backend.map().is_err());
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.evio");

        {
            let mut backend = FileBackend::create(&path).unwrap();
            backend.append(b"persistent data").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open_read(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 15);
        assert_eq!(&backend.read_at(0, 15).unwrap(), b"persistent data");
    }
}
