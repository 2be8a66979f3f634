//! Golden stream layouts.
//!
//! Exact word sequences a writer must produce for small inputs. Every
//! writer target (file, buffer, socket) yields the same words.

use crate::fixtures::SAMPLE_DICTIONARY;
use evio_core::block::MAGIC;
use evio_core::dictionary::encode_dictionary;
use serde::Serialize;

/// A known input and the stream it must produce.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenStream {
    /// Short name used in failure messages.
    pub name: &'static str,
    /// Dictionary written first, if any.
    pub dictionary: Option<&'static str>,
    /// Events written in order.
    pub events: Vec<Vec<u32>>,
    /// Expected stream words in host order.
    pub words: Vec<u32>,
}

fn header(size: u32, number: u32, count: u32, version_word: u32) -> [u32; 8] {
    [size, number, 8, count, 0, version_word, 0, MAGIC]
}

/// The standard set of golden streams.
pub fn standard_streams() -> Vec<GoldenStream> {
    let event = vec![1, 0x0001_0100, 42];
    let dictionary = encode_dictionary(SAMPLE_DICTIONARY).expect("sample dictionary encodes");

    let mut single = header(11, 1, 1, 0x4).to_vec();
    single.extend_from_slice(&event);
    single.extend_from_slice(&header(8, 2, 0, 0x204));

    let mut with_dictionary = header(8 + dictionary.len() as u32, 1, 0, 0x104).to_vec();
    with_dictionary.extend_from_slice(&dictionary);
    with_dictionary.extend_from_slice(&header(11, 2, 1, 0x4));
    with_dictionary.extend_from_slice(&event);
    with_dictionary.extend_from_slice(&header(8, 3, 0, 0x204));

    vec![
        GoldenStream {
            name: "empty",
            dictionary: None,
            events: Vec::new(),
            words: header(8, 1, 0, 0x204).to_vec(),
        },
        GoldenStream {
            name: "single_event",
            dictionary: None,
            events: vec![event.clone()],
            words: single,
        },
        GoldenStream {
            name: "dictionary_and_event",
            dictionary: Some(SAMPLE_DICTIONARY),
            events: vec![event],
            words: with_dictionary,
        },
    ]
}

/// All golden streams as JSON, for checking other implementations.
pub fn golden_json() -> String {
    serde_json::to_string_pretty(&standard_streams()).unwrap_or_default()
}

/// Converts host-order stream bytes to words.
pub fn stream_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Formats words as hex, eight per line.
pub fn hex_words(words: &[u32]) -> String {
    words
        .chunks(8)
        .map(|line| {
            line.iter()
                .map(|w| format!("{w:08x}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Asserts that `actual` matches the golden stream, printing both in hex
/// on mismatch.
pub fn assert_golden(golden: &GoldenStream, actual: &[u32]) {
    if actual != golden.words {
        panic!(
            "Golden stream '{}' mismatch:\n\
             Expected ({} words):\n{}\n\
             Actual ({} words):\n{}",
            golden.name,
            golden.words.len(),
            hex_words(&golden.words),
            actual.len(),
            hex_words(actual)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_streams_end_with_last_block() {
        for golden in standard_streams() {
            let tail = &golden.words[golden.words.len() - 8..];
            assert_eq!(tail[5] & 0x200, 0x200, "{}", golden.name);
            assert_eq!(tail[7], MAGIC);
        }
    }

    #[test]
    fn json_lists_every_stream() {
        let json = golden_json();
        for golden in standard_streams() {
            assert!(json.contains(golden.name));
        }
    }

    #[test]
    fn hex_layout() {
        assert_eq!(hex_words(&[1, 0xc0da_0100]), "00000001 c0da0100");
    }
}
