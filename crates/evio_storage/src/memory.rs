//! In-memory buffer backend.

use crate::backend::{BackendKind, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// A memory buffer backend.
///
/// Clones share the same underlying buffer, so a caller can hand one clone to
/// a writer and keep another to inspect what was written. With a capacity
/// limit the buffer behaves like a fixed caller-provided array: writes that
/// would run past the end fail with [`StorageError::CapacityExceeded`].
///
/// # Example
///
/// ```rust
/// use evio_storage::{StorageBackend, InMemoryBackend};
///
/// let shared = InMemoryBackend::new();
/// let mut writer = shared.clone();
/// writer.append(b"test data").unwrap();
/// assert_eq!(shared.data(), b"test data");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
    capacity: Option<u64>,
}

impl InMemoryBackend {
    /// Creates a new empty, growable buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer holding pre-existing data.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            capacity: None,
        }
    }

    /// Creates an empty buffer that may never grow past `capacity` bytes.
    #[must_use]
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(Vec::with_capacity(capacity))),
            capacity: Some(capacity as u64),
        }
    }

    /// Returns the fixed capacity, if any.
    #[must_use]
    pub fn capacity_limit(&self) -> Option<u64> {
        self.capacity
    }

    /// Returns a copy of all data in the buffer.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> StorageResult<()> {
        let end = offset.saturating_add(bytes.len() as u64);
        if let Some(capacity) = self.capacity {
            if end > capacity {
                return Err(StorageError::CapacityExceeded {
                    required: end,
                    capacity,
                });
            }
        }

        let mut data = self.data.write();
        let end = end as usize;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset as usize..end].copy_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.data().is_empty());
        assert_eq!(backend.kind(), BackendKind::Memory);
    }

    #[test]
    fn memory_append_returns_correct_offset() {
        let mut backend = InMemoryBackend::new();

        let offset1 = backend.append(b"hello").unwrap();
        assert_eq!(offset1, 0);

        let offset2 = backend.append(b" world").unwrap();
        assert_eq!(offset2, 5);

        assert_eq!(backend.size().unwrap(), 11);
    }

    #[test]
    fn memory_write_at_overwrites_in_place() {
        let mut backend = InMemoryBackend::with_data(b"hello world".to_vec());
        backend.write_at(6, b"there").unwrap();
        assert_eq!(backend.data(), b"hello there");
        assert_eq!(backend.size().unwrap(), 11);
    }

    #[test]
    fn memory_write_at_past_end_extends() {
        let mut backend = InMemoryBackend::with_data(b"ab".to_vec());
        backend.write_at(4, b"cd").unwrap();
        assert_eq!(backend.data(), b"ab\0\0cd");
    }

    #[test]
    fn memory_read_at_past_end_reports_size() {
        let backend = InMemoryBackend::with_data(b"hello".to_vec());

        match backend.read_at(3, 10) {
            Err(StorageError::ReadPastEnd { size, .. }) => assert_eq!(size, 5),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(backend.read_at(5, 4).unwrap_err().is_clean_end());
    }

    #[test]
    fn memory_clones_share_data() {
        let shared = InMemoryBackend::new();
        let mut writer = shared.clone();
        writer.append(b"abc").unwrap();
        assert_eq!(shared.data(), b"abc");
    }

    #[test]
    fn memory_capacity_limit_rejects_overflow() {
        let mut backend = InMemoryBackend::with_capacity_limit(8);
        backend.write_at(0, b"12345678").unwrap();

        let result = backend.write_at(4, b"56789");
        assert!(matches!(
            result,
            Err(StorageError::CapacityExceeded {
                required: 9,
                capacity: 8
            })
        ));
        assert_eq!(backend.data(), b"12345678");
    }

    #[test]
    fn memory_flush_succeeds() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"data").unwrap();
        assert!(backend.flush().is_ok());
        assert!(backend.sync().is_ok());
    }
}
