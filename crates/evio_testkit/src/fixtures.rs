//! Test fixtures and stream helpers.
//!
//! Provides sample events, temporary output directories and helpers that
//! write or read whole streams through a [`Registry`].

use evio_codec::{encode_event, swap_event, Node, Payload, SwapDirection};
use evio_core::{
    BlockHeader, EvioResult, Handle, InMemoryBackend, OpenOptions, Registry, Target,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A dictionary accepted by every writer.
pub const SAMPLE_DICTIONARY: &str =
    "<xmlDict><bank name=\"hits\" tag=\"1\"><leaf name=\"adc\" tag=\"2\"/></bank></xmlDict>";

/// A small nested event whose contents depend on `i`.
pub fn sample_event(i: u32) -> Vec<u32> {
    let tree = Node::bank(
        1,
        (i % 256) as u8,
        Payload::Banks(vec![
            Node::bank(2, 0, Payload::UInt32(vec![i, i.wrapping_mul(3), !i])),
            Node::bank(
                3,
                1,
                Payload::Segments(vec![
                    Node::segment(4, Payload::Int16(vec![i as i16, (i as i16).wrapping_neg()])),
                    Node::segment(5, Payload::Float64(vec![f64::from(i) * 0.5])),
                ]),
            ),
            Node::bank(6, 2, Payload::Strings(vec![format!("event-{i}")])),
        ]),
    );
    encode_event(&tree).expect("sample events encode")
}

/// A flat `uint32` bank of `data_words` words, each holding `i`.
pub fn flat_event(i: u32, data_words: usize) -> Vec<u32> {
    let mut words = vec![i; data_words + 2];
    words[0] = data_words as u32 + 1;
    words[1] = 0x0001_0100 | (i & 0xff);
    words
}

/// A temporary directory that is removed when dropped.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file in the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// A file name template in the directory.
    pub fn template(&self, pattern: &str) -> String {
        format!("{}/{pattern}", self.dir.path().display())
    }

    /// Files in the directory, sorted by name.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(self.dir.path())
            .expect("Failed to list temp directory")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        files
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `events` (after an optional dictionary) and closes the handle.
///
/// `mode` is a write mode such as `"w"`, `"s"`, `"wb"` or `"ws"`.
pub fn write_stream(
    registry: &Registry,
    target: impl Into<Target>,
    mode: &str,
    options: &OpenOptions,
    dictionary: Option<&str>,
    events: &[Vec<u32>],
) -> EvioResult<()> {
    let handle = registry.open_with(target, mode, options)?;
    if let Some(xml) = dictionary {
        registry.write_dictionary(handle, xml)?;
    }
    for event in events {
        registry.write(handle, event)?;
    }
    registry.close(handle)
}

/// Writes `events` into a fresh memory buffer with default options.
pub fn write_buffer(dictionary: Option<&str>, events: &[Vec<u32>]) -> InMemoryBackend {
    let buffer = InMemoryBackend::new();
    write_stream(
        &Registry::new(),
        buffer.clone(),
        "wb",
        &OpenOptions::new(),
        dictionary,
        events,
    )
    .expect("Failed to write buffer");
    buffer
}

/// Reads every remaining event of a sequential handle.
pub fn read_all(registry: &Registry, handle: Handle) -> EvioResult<Vec<Vec<u32>>> {
    let mut events = Vec::new();
    while let Some(event) = registry.read_alloc(handle)? {
        events.push(event);
    }
    Ok(events)
}

/// Opens `target` for sequential reading and returns the dictionary and
/// every event.
pub fn read_stream(
    target: impl Into<Target>,
    mode: &str,
) -> EvioResult<(Option<String>, Vec<Vec<u32>>)> {
    let registry = Registry::new();
    let handle = registry.open(target, mode)?;
    let dictionary = registry.dictionary(handle)?;
    let events = read_all(&registry, handle)?;
    registry.close(handle)?;
    Ok((dictionary, events))
}

/// Reads every event of a random-access target, in index order.
pub fn read_random(target: impl Into<Target>, mode: &str) -> EvioResult<Vec<Vec<u32>>> {
    let registry = Registry::new();
    let handle = registry.open(target, mode)?;
    let count = registry.event_table(handle)?.len();
    let events = (1..=count)
        .map(|n| registry.read_random(handle, n).map(|view| view.to_words()))
        .collect::<EvioResult<Vec<_>>>()?;
    registry.close(handle)?;
    Ok(events)
}

/// Converts a host-order version 4 stream to the opposite byte order, as a
/// machine of the other endianness would have written it.
pub fn to_foreign_order(bytes: &[u8]) -> EvioResult<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut offset = 0;
    let mut first = true;
    while offset < bytes.len() {
        let header = BlockHeader::from_bytes(&bytes[offset..], false)?;
        let header_end = offset + header.header_words() as usize * 4;
        let block_end = offset + header.size() as usize * 4;
        for word in words_of(&bytes[offset..header_end]) {
            out.extend_from_slice(&word.swap_bytes().to_ne_bytes());
        }

        let mut pos = header_end;
        let events = header.count() as usize + usize::from(first && header.has_dictionary());
        for _ in 0..events {
            let len = words_of(&bytes[pos..pos + 4])[0] as usize + 1;
            let mut event = words_of(&bytes[pos..pos + len * 4]);
            swap_event(&mut event, SwapDirection::ToForeign)?;
            for word in event {
                out.extend_from_slice(&word.to_ne_bytes());
            }
            pos += len * 4;
        }
        debug_assert_eq!(pos, block_end);

        first = false;
        offset = block_end;
        if header.is_last() {
            break;
        }
    }
    Ok(out)
}

fn words_of(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_events_differ() {
        assert_ne!(sample_event(1), sample_event(2));
        assert_eq!(sample_event(7)[0] as usize + 1, sample_event(7).len());
    }

    #[test]
    fn flat_event_layout() {
        assert_eq!(flat_event(5, 3), vec![4, 0x0001_0105, 5, 5, 5]);
    }

    #[test]
    fn foreign_copy_reads_back() {
        let events: Vec<_> = (0..10).map(sample_event).collect();
        let native = write_buffer(Some(SAMPLE_DICTIONARY), &events);
        let foreign = to_foreign_order(&native.data()).unwrap();
        assert_eq!(foreign.len(), native.data().len());
        assert_ne!(foreign, native.data());

        let (dictionary, read) = read_stream(InMemoryBackend::with_data(foreign), "rb").unwrap();
        assert_eq!(dictionary.as_deref(), Some(SAMPLE_DICTIONARY));
        assert_eq!(read, events);
    }

    #[test]
    fn temp_dir_lists_files() {
        let dir = TestDir::new();
        std::fs::write(dir.file("b"), b"1").unwrap();
        std::fs::write(dir.file("a"), b"2").unwrap();
        assert_eq!(dir.files(), vec![dir.file("a"), dir.file("b")]);
        assert!(dir.template("x_%d").ends_with("/x_%d"));
    }
}
