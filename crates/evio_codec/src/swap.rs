//! Endian-swap engine.
//!
//! Events are held as `u32` words whose in-memory bytes are exactly the
//! bytes of the stream. Swapping therefore never needs to know the host byte
//! order: it only needs to know whether each header word is currently in
//! foreign order (swapping *to local*) or local order (swapping *to
//! foreign*), because header lengths must be read in local order to walk
//! the structure.
//!
//! Every function here is pure. Applying a swap toward local and then the
//! same swap toward foreign restores the input exactly.

use crate::composite::swap_composite_bytes;
use crate::error::{CodecError, CodecResult};
use crate::format::CompiledFormat;
use crate::types::{ContainerKind, DataType, StructureHeader, SwapClass};

/// Which way a swap is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    /// The input is in foreign order; the output will be local.
    ToLocal,
    /// The input is in local order; the output will be foreign.
    ToForeign,
}

impl SwapDirection {
    /// Swaps `word` in place and returns its value in local order.
    #[inline]
    pub fn swap_word(self, word: &mut u32) -> u32 {
        let raw = *word;
        let swapped = raw.swap_bytes();
        *word = swapped;
        match self {
            Self::ToLocal => swapped,
            Self::ToForeign => raw,
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::ToLocal => Self::ToForeign,
            Self::ToForeign => Self::ToLocal,
        }
    }
}

/// Reverses the bytes of every 32-bit word.
pub fn swap_words(words: &mut [u32]) {
    for word in words {
        *word = word.swap_bytes();
    }
}

/// Reverses the bytes of every 16-bit half of every word.
pub fn swap_halfwords(words: &mut [u32]) {
    for word in words {
        *word = ((*word & 0x00ff_00ff) << 8) | ((*word & 0xff00_ff00) >> 8);
    }
}

/// Reverses the bytes of every 64-bit element (pairs of words).
///
/// A trailing odd word is left untouched.
pub fn swap_doublewords(words: &mut [u32]) {
    for pair in words.chunks_exact_mut(2) {
        let (first, second) = (pair[0], pair[1]);
        pair[0] = second.swap_bytes();
        pair[1] = first.swap_bytes();
    }
}

/// Swaps a complete event in place.
///
/// An event is a bank; its declared length must fit inside `words`. Words
/// past the end of the event are left alone.
///
/// # Errors
///
/// Returns an error if any declared length overruns its parent or the
/// buffer, or if a composite format string is invalid.
pub fn swap_event(words: &mut [u32], direction: SwapDirection) -> CodecResult<()> {
    swap_structure(words, ContainerKind::Bank, direction).map(|_| ())
}

/// Returns a swapped copy of an event, leaving the source alone.
///
/// # Errors
///
/// See [`swap_event`].
pub fn swapped_event(words: &[u32], direction: SwapDirection) -> CodecResult<Vec<u32>> {
    let mut copy = words.to_vec();
    swap_event(&mut copy, direction)?;
    Ok(copy)
}

/// Swaps one structure of the given shape at the start of `words` and
/// returns the number of words it occupies.
///
/// # Errors
///
/// See [`swap_event`].
pub fn swap_structure(
    words: &mut [u32],
    kind: ContainerKind,
    direction: SwapDirection,
) -> CodecResult<usize> {
    let header_words = kind.header_words();
    if words.len() < header_words {
        return Err(CodecError::truncated(header_words, words.len()));
    }

    let mut local = [0u32; 2];
    for (slot, word) in local.iter_mut().zip(words.iter_mut()).take(header_words) {
        *slot = direction.swap_word(word);
    }
    let header = StructureHeader::decode(kind, &local[..header_words])?;

    let total = header.total_words();
    if total < header_words {
        return Err(CodecError::invalid_header(format!(
            "{kind:?} length {} shorter than its header",
            header.length
        )));
    }
    if total > words.len() {
        return Err(CodecError::truncated(total, words.len()));
    }

    swap_data(&mut words[header_words..total], header.data_type, direction)?;
    Ok(total)
}

/// Swaps a payload of the given type in place.
///
/// # Errors
///
/// See [`swap_event`].
pub fn swap_data(
    data: &mut [u32],
    data_type: DataType,
    direction: SwapDirection,
) -> CodecResult<()> {
    match data_type.swap_class() {
        SwapClass::Bytes => {}
        SwapClass::Half => swap_halfwords(data),
        SwapClass::Word => swap_words(data),
        SwapClass::Double => swap_doublewords(data),
        SwapClass::Container(kind) => {
            let mut offset = 0;
            while offset < data.len() {
                offset += swap_structure(&mut data[offset..], kind, direction)?;
            }
        }
        SwapClass::Composite => swap_composite(data, direction)?,
    }
    Ok(())
}

/// Swaps composite payload: a sequence of (format tagsegment, data bank)
/// pairs.
fn swap_composite(data: &mut [u32], direction: SwapDirection) -> CodecResult<()> {
    let mut offset = 0;
    while offset < data.len() {
        // Format string tagsegment: only the header word is swapped.
        let fmt_header = direction.swap_word(&mut data[offset]);
        let fmt_len = ContainerKind::TagSegment.length_of(fmt_header);
        let fmt_start = offset + 1;
        let fmt_end = fmt_start + fmt_len;
        if fmt_end > data.len() {
            return Err(CodecError::truncated(fmt_end, data.len()));
        }
        let format = CompiledFormat::from_words(&data[fmt_start..fmt_end])?;

        // Data bank: two header words, then the formatted data.
        let bank_start = fmt_end;
        if bank_start + 2 > data.len() {
            return Err(CodecError::truncated(bank_start + 2, data.len()));
        }
        let bank_len = direction.swap_word(&mut data[bank_start]) as usize;
        direction.swap_word(&mut data[bank_start + 1]);
        if bank_len < 1 {
            return Err(CodecError::invalid_header("composite data bank has no header"));
        }
        let data_start = bank_start + 2;
        let data_end = bank_start + 1 + bank_len;
        if data_end > data.len() {
            return Err(CodecError::truncated(data_end, data.len()));
        }

        let payload = &mut data[data_start..data_end];
        let mut bytes: Vec<u8> = payload.iter().flat_map(|w| w.to_ne_bytes()).collect();
        swap_composite_bytes(&mut bytes, &format, direction);
        for (word, chunk) in payload.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        offset = data_end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INT32_BANK: u32 = 0x0001_0b00;
    const BANK_OF_BANKS: u32 = 0x0002_0e00;

    #[test]
    fn primitive_swaps() {
        let mut words = [0x1122_3344, 0x5566_7788];
        swap_words(&mut words);
        assert_eq!(words, [0x4433_2211, 0x8877_6655]);

        let mut halves = [0x1122_3344];
        swap_halfwords(&mut halves);
        assert_eq!(halves, [0x2211_4433]);

        let mut doubles = [0x1122_3344, 0x5566_7788, 0xdead_beef];
        swap_doublewords(&mut doubles);
        assert_eq!(doubles, [0x8877_6655, 0x4433_2211, 0xdead_beef]);
    }

    #[test]
    fn swap_flat_bank_to_foreign() {
        let mut event = [3, INT32_BANK, 1, 2];
        swap_event(&mut event, SwapDirection::ToForeign).unwrap();
        assert_eq!(
            event,
            [
                3u32.swap_bytes(),
                INT32_BANK.swap_bytes(),
                1u32.swap_bytes(),
                2u32.swap_bytes()
            ]
        );
    }

    #[test]
    fn swap_nested_bank_round_trip() {
        let original = vec![
            7, BANK_OF_BANKS, // outer
            2, INT32_BANK, 7, // child 1
            2, 0x0003_0300, 0x6162_6364, // child 2: string, untouched bytes
        ];
        let mut event = original.clone();
        swap_event(&mut event, SwapDirection::ToForeign).unwrap();
        assert_ne!(event, original);
        assert_eq!(event[7], 0x6162_6364);

        swap_event(&mut event, SwapDirection::ToLocal).unwrap();
        assert_eq!(event, original);
    }

    #[test]
    fn swap_segments_and_tagsegments() {
        let original = vec![
            5, 0x0001_0d00, // bank of segments
            0x0101_0001, 9, // segment of uint32
            0x000c_0001, // segment of tagsegments, len 1
            0x0011_0000, // empty tagsegment of unknown32
        ];
        let mut event = original.clone();
        swap_event(&mut event, SwapDirection::ToForeign).unwrap();
        assert_eq!(event[3], 9u32.swap_bytes());
        swap_event(&mut event, SwapDirection::ToLocal).unwrap();
        assert_eq!(event, original);
    }

    #[test]
    fn swap_rejects_overlong_child() {
        let mut event = vec![4, BANK_OF_BANKS, 9, INT32_BANK, 1];
        let result = swap_event(&mut event, SwapDirection::ToForeign);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn swap_rejects_event_longer_than_buffer() {
        let mut event = vec![10, INT32_BANK, 1];
        assert_eq!(
            swap_event(&mut event, SwapDirection::ToForeign),
            Err(CodecError::truncated(11, 3))
        );
    }

    #[test]
    fn swapped_event_leaves_source() {
        let source = vec![2, INT32_BANK, 42];
        let copy = swapped_event(&source, SwapDirection::ToForeign).unwrap();
        assert_eq!(source, vec![2, INT32_BANK, 42]);
        assert_eq!(copy[2], 42u32.swap_bytes());
    }

    #[test]
    fn direction_reads_local_value() {
        let mut foreign = 5u32.swap_bytes();
        assert_eq!(SwapDirection::ToLocal.swap_word(&mut foreign), 5);
        assert_eq!(foreign, 5);

        let mut local = 5u32;
        assert_eq!(SwapDirection::ToForeign.swap_word(&mut local), 5);
        assert_eq!(local, 5u32.swap_bytes());
        assert_eq!(SwapDirection::ToLocal.reverse(), SwapDirection::ToForeign);
    }
}
