//! Header-only walks over positional streams.

use super::header::BlockHeader;
use crate::config::HEADER_WORDS;
use crate::error::{EvioError, EvioResult};
use evio_storage::{StorageBackend, StorageError};

/// A block found by [`scan_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedBlock {
    /// Byte offset of the header.
    pub offset: u64,
    /// Header in host order.
    pub header: BlockHeader,
}

impl ScannedBlock {
    /// Byte offset just past the block.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.header.size()) * 4
    }
}

/// Result of walking every block header of a stream.
#[derive(Debug, Clone, Default)]
pub struct BlockScan {
    /// Whether the stream is byte swapped relative to the host.
    pub swapped: bool,
    /// Blocks in stream order, up to and including a last-flagged block.
    pub blocks: Vec<ScannedBlock>,
}

impl BlockScan {
    /// Format version of the first block.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.blocks.first().map_or(0, |b| b.header.version())
    }

    /// Sum of the per-block event counts (version 4 streams).
    ///
    /// Dictionary events are not part of any block count.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        if self.version() < 4 {
            return 0;
        }
        self.blocks
            .iter()
            .map(|b| u64::from(b.header.count()))
            .sum()
    }

    /// The final block found.
    #[must_use]
    pub fn last(&self) -> Option<&ScannedBlock> {
        self.blocks.last()
    }

    /// Returns true if the walk stopped on a last-flagged block.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.last().is_some_and(|b| b.header.is_last())
    }
}

/// Walks block headers from the start of a positional backend.
///
/// The walk stops at a last-flagged block or at a clean end of data.
///
/// # Errors
///
/// - [`EvioError::BadFile`] for an empty stream or a malformed header
/// - [`EvioError::UnexpectedEnd`] if a header or block is cut short
pub fn scan_blocks(backend: &dyn StorageBackend) -> EvioResult<BlockScan> {
    let size = backend.size()?;
    if size == 0 {
        return Err(EvioError::bad_file("stream is empty"));
    }

    let mut scan = BlockScan::default();
    let mut offset = 0u64;
    loop {
        let bytes = match backend.read_at(offset, HEADER_WORDS * 4) {
            Ok(bytes) => bytes,
            Err(e) if e.is_clean_end() && offset > 0 => break,
            Err(StorageError::ReadPastEnd { .. }) => {
                return Err(EvioError::unexpected_end(format!(
                    "block header at byte {offset} is cut short"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let header = if scan.blocks.is_empty() {
            let (header, swapped) = BlockHeader::detect(super::header::raw_words(&bytes)?)?;
            scan.swapped = swapped;
            header
        } else {
            BlockHeader::from_bytes(&bytes, scan.swapped)?
        };

        let block = ScannedBlock { offset, header };
        if block.end() > size {
            return Err(EvioError::unexpected_end(format!(
                "block {} at byte {offset} declares {} words, stream has {} bytes left",
                header.number(),
                header.size(),
                size - offset
            )));
        }
        scan.blocks.push(block);
        if header.is_last() {
            break;
        }
        offset = block.end();
    }
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evio_storage::InMemoryBackend;

    fn stream(blocks: &[Vec<u32>]) -> InMemoryBackend {
        let bytes = blocks
            .iter()
            .flatten()
            .flat_map(|w| w.to_ne_bytes())
            .collect();
        InMemoryBackend::with_data(bytes)
    }

    fn block(number: u32, events: &[&[u32]], last: bool) -> Vec<u32> {
        let mut header = if last {
            BlockHeader::empty_last(number)
        } else {
            BlockHeader::new(number)
        }
        .words();
        let data: Vec<u32> = events.iter().flat_map(|e| e.iter().copied()).collect();
        header[0] = 8 + data.len() as u32;
        header[3] = events.len() as u32;
        let mut words = header.to_vec();
        words.extend(data);
        words
    }

    #[test]
    fn counts_events_until_last() {
        let backend = stream(&[
            block(1, &[&[1, 0x0001_0100, 5], &[1, 0x0002_0100, 6]], false),
            block(2, &[&[1, 0x0003_0100, 7]], false),
            block(3, &[], true),
        ]);
        let scan = scan_blocks(&backend).unwrap();
        assert!(!scan.swapped);
        assert_eq!(scan.blocks.len(), 3);
        assert_eq!(scan.event_count(), 3);
        assert!(scan.is_terminated());
        assert_eq!(scan.last().unwrap().offset, 4 * (14 + 11));
    }

    #[test]
    fn unterminated_stream_ends_cleanly() {
        let backend = stream(&[block(1, &[&[1, 0x0001_0100, 5]], false)]);
        let scan = scan_blocks(&backend).unwrap();
        assert_eq!(scan.event_count(), 1);
        assert!(!scan.is_terminated());
    }

    #[test]
    fn foreign_stream_is_detected() {
        let words = block(1, &[], true);
        let swapped: Vec<u32> = words.iter().map(|w| w.swap_bytes()).collect();
        let scan = scan_blocks(&stream(&[swapped])).unwrap();
        assert!(scan.swapped);
        assert_eq!(scan.last().unwrap().header.number(), 1);
    }

    #[test]
    fn cut_short_is_unexpected_end() {
        let mut words = block(1, &[&[1, 0x0001_0100, 5]], false);
        words.truncate(9);
        assert!(matches!(
            scan_blocks(&stream(&[words])),
            Err(EvioError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            scan_blocks(&InMemoryBackend::new()),
            Err(EvioError::BadFile { .. })
        ));
    }
}
