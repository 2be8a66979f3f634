//! Per-version block layouts.

use super::header::BlockHeader;
use std::fmt::Debug;
use std::ops::Range;

/// Version-specific rules for locating event data inside a block.
///
/// One layout is chosen when a stream is opened, from the version of its
/// first block.
pub trait BlockLayout: Debug + Send + Sync {
    /// Word range, relative to the block start, that holds event data.
    ///
    /// `first` is true for the first block of the stream.
    fn data_span(&self, header: &BlockHeader, first: bool) -> Range<usize>;

    /// Returns true if the stream ends once this block is exhausted.
    fn ends_stream(&self, header: &BlockHeader) -> bool;

    /// Returns true if every event lies inside a single block.
    fn events_fit_blocks(&self) -> bool;

    /// Returns true if the header's count word is an event count.
    fn counts_events(&self) -> bool;
}

/// Versions 1 to 3: explicit start and used-word offsets, events may
/// straddle blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLayout;

impl BlockLayout for LegacyLayout {
    fn data_span(&self, header: &BlockHeader, first: bool) -> Range<usize> {
        let header_words = header.header_words() as usize;
        let size = header.size() as usize;
        let end = (header.used() as usize).clamp(header_words, size);
        // A leading fragment in the first block belongs to no event.
        let start = if first {
            (header.count() as usize).clamp(header_words, end)
        } else {
            header_words
        };
        start..end
    }

    fn ends_stream(&self, _header: &BlockHeader) -> bool {
        false
    }

    fn events_fit_blocks(&self) -> bool {
        false
    }

    fn counts_events(&self) -> bool {
        false
    }
}

/// Version 4: data fills the block after the header, the last-block flag
/// marks the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModernLayout;

impl BlockLayout for ModernLayout {
    fn data_span(&self, header: &BlockHeader, _first: bool) -> Range<usize> {
        header.header_words() as usize..header.size() as usize
    }

    fn ends_stream(&self, header: &BlockHeader) -> bool {
        header.is_last()
    }

    fn events_fit_blocks(&self) -> bool {
        true
    }

    fn counts_events(&self) -> bool {
        true
    }
}

static LEGACY: LegacyLayout = LegacyLayout;
static MODERN: ModernLayout = ModernLayout;

/// Returns the layout for a format version.
#[must_use]
pub fn layout_for(version: u32) -> &'static dyn BlockLayout {
    if version >= 4 {
        &MODERN
    } else {
        &LEGACY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::header::MAGIC;

    fn legacy(size: u32, start: u32, used: u32) -> BlockHeader {
        let (header, _) =
            BlockHeader::detect([size, 1, 8, start, used, 2, 0, MAGIC]).unwrap();
        header
    }

    #[test]
    fn legacy_first_block_skips_fragment() {
        let header = legacy(100, 12, 40);
        let layout = layout_for(2);
        assert_eq!(layout.data_span(&header, true), 12..40);
        assert_eq!(layout.data_span(&header, false), 8..40);
        assert!(!layout.ends_stream(&header));
    }

    #[test]
    fn legacy_offsets_are_clamped() {
        let header = legacy(20, 2, 500);
        assert_eq!(LegacyLayout.data_span(&header, true), 8..20);
    }

    #[test]
    fn modern_span_and_end() {
        let header = BlockHeader::empty_last(4);
        let layout = layout_for(4);
        assert!(layout.data_span(&header, true).is_empty());
        assert!(layout.ends_stream(&header));
        assert!(layout.events_fit_blocks());
        assert!(!layout_for(3).counts_events());
    }
}
