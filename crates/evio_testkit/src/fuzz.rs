//! Fuzz testing harnesses for EVIO.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks. Every target must return without
//! panicking for any input.

use evio_codec::{
    decode_event, swap_composite_bytes, swap_event, CompiledFormat, SwapDirection,
};
use evio_core::{InMemoryBackend, Registry};

fn words_of(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Fuzz target for sequential stream reading.
///
/// Arbitrary bytes either read as a stream or fail with an error.
pub fn fuzz_stream_read(data: &[u8]) {
    let registry = Registry::new();
    let Ok(handle) = registry.open(InMemoryBackend::with_data(data.to_vec()), "rb") else {
        return;
    };
    let _ = registry.dictionary(handle);
    while let Ok(Some(_)) = registry.read_alloc(handle) {}
    let _ = registry.close(handle);
}

/// Fuzz target for random-access indexing.
pub fn fuzz_random_access(data: &[u8]) {
    let registry = Registry::new();
    let Ok(handle) = registry.open(InMemoryBackend::with_data(data.to_vec()), "rab") else {
        return;
    };
    if let Ok(table) = registry.event_table(handle) {
        for number in 1..=table.len() {
            if let Ok(view) = registry.read_random(handle, number) {
                assert_eq!(view.len(), table[number - 1].words);
            }
        }
    }
    let _ = registry.close(handle);
}

/// Fuzz target for the structure swapper.
///
/// When an event swaps to foreign order, swapping it back must restore it.
pub fn fuzz_swap_event(data: &[u8]) {
    let original = words_of(data);
    let mut words = original.clone();
    if swap_event(&mut words, SwapDirection::ToForeign).is_ok()
        && swap_event(&mut words, SwapDirection::ToLocal).is_ok()
    {
        assert_eq!(words, original, "Swap roundtrip mismatch");
    }
}

/// Fuzz target for the event decoder.
pub fn fuzz_decode_event(data: &[u8]) {
    let _ = decode_event(&words_of(data));
}

/// Fuzz target for the composite format compiler and interpreter.
///
/// The first byte gives the length of the format string; the rest is
/// record data.
pub fn fuzz_composite(data: &[u8]) {
    let Some((&len, rest)) = data.split_first() else {
        return;
    };
    let split = (len as usize).min(rest.len());
    let (format, record) = rest.split_at(split);
    let Ok(format) = std::str::from_utf8(format) else {
        return;
    };
    let Ok(compiled) = CompiledFormat::compile(format) else {
        return;
    };
    let mut bytes = record.to_vec();
    swap_composite_bytes(&mut bytes, &compiled, SwapDirection::ToForeign);
    swap_composite_bytes(&mut bytes, &compiled, SwapDirection::ToLocal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_event, write_buffer, SAMPLE_DICTIONARY};

    #[test]
    fn empty_inputs() {
        fuzz_stream_read(&[]);
        fuzz_random_access(&[]);
        fuzz_swap_event(&[]);
        fuzz_decode_event(&[]);
        fuzz_composite(&[]);
    }

    #[test]
    fn corrupted_streams() {
        let events: Vec<_> = (0..20).map(sample_event).collect();
        let stream = write_buffer(Some(SAMPLE_DICTIONARY), &events).data();
        for cut in (0..stream.len()).step_by(37) {
            fuzz_stream_read(&stream[..cut]);
            fuzz_random_access(&stream[..cut]);
        }
        let mut flipped = stream.clone();
        for i in (0..flipped.len()).step_by(13) {
            flipped[i] ^= 0x5a;
        }
        fuzz_stream_read(&flipped);
        fuzz_random_access(&flipped);
    }

    #[test]
    fn arbitrary_formats() {
        fuzz_composite(b"\x06N(i,F)\x01\x00\x00\x00\x02\x00\x00\x00\x00\x00\x80\x3f");
        fuzz_composite(b"\x04((((abc");
        fuzz_composite(b"\x03I()");
    }

    #[test]
    fn swap_sample_events() {
        for i in 0..8 {
            let words = sample_event(i);
            let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
            fuzz_swap_event(&bytes);
            fuzz_decode_event(&bytes);
        }
    }
}
