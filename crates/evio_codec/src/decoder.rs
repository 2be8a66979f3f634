//! Event tree decoder.

use crate::error::{CodecError, CodecResult};
use crate::types::{ContainerKind, DataType, StructureHeader};
use crate::value::{CompositeItem, Node, Payload};
use bytes::Buf;

/// Decodes an event (a bank) from host-order words.
///
/// Words past the end of the event are ignored.
///
/// # Errors
///
/// Returns an error if a declared length overruns its parent, or string data
/// is not UTF-8.
pub fn decode_event(words: &[u32]) -> CodecResult<Node> {
    EventDecoder::new(words).decode(ContainerKind::Bank)
}

/// Splits string-typed payload bytes into strings.
///
/// Trailing `0x04` padding is dropped. Data without any NUL is a single
/// string.
///
/// # Errors
///
/// Returns [`CodecError::InvalidUtf8`] if a string is not UTF-8.
pub fn unpack_strings(bytes: &[u8]) -> CodecResult<Vec<String>> {
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == 0x04 {
        end -= 1;
    }
    let body = &bytes[..end];
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let mut pieces: Vec<&[u8]> = body.split(|&b| b == 0).collect();
    if body.last() == Some(&0) {
        pieces.pop();
    }
    pieces
        .into_iter()
        .map(|piece| {
            std::str::from_utf8(piece)
                .map(str::to_owned)
                .map_err(|_| CodecError::InvalidUtf8)
        })
        .collect()
}

/// Converts host-order words to their in-memory bytes.
#[must_use]
pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_ne_bytes()).collect()
}

/// Cursor-based decoder over a slice of words.
pub struct EventDecoder<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> EventDecoder<'a> {
    /// Creates a decoder positioned at the first word.
    #[must_use]
    pub fn new(words: &'a [u32]) -> Self {
        Self { words, pos: 0 }
    }

    /// Current word position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns true if every word has been consumed.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.words.len()
    }

    /// Decodes the next structure of the given shape.
    ///
    /// # Errors
    ///
    /// See [`decode_event`].
    pub fn decode(&mut self, kind: ContainerKind) -> CodecResult<Node> {
        let rest = &self.words[self.pos.min(self.words.len())..];
        let header = StructureHeader::decode(kind, rest)?;
        let total = header.total_words();
        if total < kind.header_words() {
            return Err(CodecError::invalid_header(format!(
                "{kind:?} length {} shorter than its header",
                header.length
            )));
        }
        if total > rest.len() {
            return Err(CodecError::truncated(total, rest.len()));
        }

        let data = &rest[kind.header_words()..total];
        let payload = decode_payload(data, &header)?;
        self.pos += total;
        Ok(Node {
            kind,
            tag: header.tag,
            num: header.num,
            payload,
        })
    }
}

fn decode_payload(data: &[u32], header: &StructureHeader) -> CodecResult<Payload> {
    let bytes = words_to_bytes(data);
    let usable = bytes.len().saturating_sub(usize::from(header.padding));
    let buf = &bytes[..usable];

    let payload = match header.data_type {
        DataType::Unknown32 => Payload::Unknown32(data.to_vec()),
        DataType::UInt32 => Payload::UInt32(data.to_vec()),
        DataType::Int32 => Payload::Int32(read_all(buf, 4, |b| b.get_i32_ne())),
        DataType::Float32 => Payload::Float32(read_all(buf, 4, |b| b.get_f32_ne())),
        DataType::Float64 => Payload::Float64(read_all(buf, 8, |b| b.get_f64_ne())),
        DataType::Int64 => Payload::Int64(read_all(buf, 8, |b| b.get_i64_ne())),
        DataType::UInt64 => Payload::UInt64(read_all(buf, 8, |b| b.get_u64_ne())),
        DataType::Int16 => Payload::Int16(read_all(buf, 2, |b| b.get_i16_ne())),
        DataType::UInt16 => Payload::UInt16(read_all(buf, 2, |b| b.get_u16_ne())),
        DataType::Int8 => Payload::Int8(read_all(buf, 1, |b| b.get_i8())),
        DataType::UInt8 => Payload::UInt8(buf.to_vec()),
        DataType::String => Payload::Strings(unpack_strings(&bytes)?),
        DataType::Bank => Payload::Banks(decode_children(data, ContainerKind::Bank)?),
        DataType::Segment => Payload::Segments(decode_children(data, ContainerKind::Segment)?),
        DataType::TagSegment => {
            Payload::TagSegments(decode_children(data, ContainerKind::TagSegment)?)
        }
        DataType::Composite => Payload::Composite(decode_composite(data)?),
        DataType::Other(code) => Payload::Raw {
            code,
            words: data.to_vec(),
        },
    };
    Ok(payload)
}

fn read_all<T>(mut buf: &[u8], width: usize, get: impl Fn(&mut &[u8]) -> T) -> Vec<T> {
    let mut values = Vec::with_capacity(buf.len() / width);
    while buf.remaining() >= width {
        values.push(get(&mut buf));
    }
    values
}

fn decode_children(data: &[u32], kind: ContainerKind) -> CodecResult<Vec<Node>> {
    let mut decoder = EventDecoder::new(data);
    let mut children = Vec::new();
    while !decoder.is_at_end() {
        children.push(decoder.decode(kind)?);
    }
    Ok(children)
}

fn decode_composite(data: &[u32]) -> CodecResult<Vec<CompositeItem>> {
    let mut decoder = EventDecoder::new(data);
    let mut items = Vec::new();
    while !decoder.is_at_end() {
        let format = decoder.decode(ContainerKind::TagSegment)?;
        let Payload::Strings(strings) = &format.payload else {
            return Err(CodecError::invalid_header(
                "composite format tagsegment does not hold a string",
            ));
        };
        let text = strings.first().cloned().unwrap_or_default();

        let start = decoder.position();
        let header = StructureHeader::decode(ContainerKind::Bank, &data[start..])?;
        let total = header.total_words();
        if total < 2 {
            return Err(CodecError::invalid_header("composite data bank has no header"));
        }
        if start + total > data.len() {
            return Err(CodecError::truncated(start + total, data.len()));
        }
        let mut bytes = words_to_bytes(&data[start + 2..start + total]);
        bytes.truncate(bytes.len().saturating_sub(usize::from(header.padding)));

        items.push(CompositeItem {
            format: text,
            format_tag: format.tag,
            data_tag: header.tag,
            data_num: header.num,
            data: bytes,
        });
        // Skip the data bank.
        decoder.pos = start + total;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_event, pack_strings};
    use proptest::prelude::*;

    #[test]
    fn decode_flat_bank() {
        let node = decode_event(&[3, 0x0007_0103, 10, 20]).unwrap();
        assert_eq!(node.tag, 7);
        assert_eq!(node.num, 3);
        assert_eq!(node.payload, Payload::UInt32(vec![10, 20]));
    }

    #[test]
    fn decode_respects_padding() {
        let node = Node::bank(1, 0, Payload::Int8(vec![-1, 2, -3]));
        let decoded = decode_event(&encode_event(&node).unwrap()).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn strings_unpack() {
        assert_eq!(unpack_strings(&pack_strings(&["a", "bc"])).unwrap(), ["a", "bc"]);
        assert_eq!(unpack_strings(b"legacy").unwrap(), ["legacy"]);
        assert!(unpack_strings(b"\x04\x04\x04\x04").unwrap().is_empty());
        assert_eq!(unpack_strings(&[0xff, 0]), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn nested_tree_survives() {
        let node = Node::bank(
            1,
            2,
            Payload::Banks(vec![
                Node::bank(
                    3,
                    4,
                    Payload::Segments(vec![Node::segment(5, Payload::Float64(vec![1.5, -2.25]))]),
                ),
                Node::bank(
                    6,
                    0,
                    Payload::TagSegments(vec![Node::tagsegment(0x123, Payload::Strings(vec![
                        "hello".into(),
                        "world".into(),
                    ]))]),
                ),
                Node::bank(
                    7,
                    0,
                    Payload::Composite(vec![CompositeItem::new(
                        "N(i,s)",
                        vec![1, 0, 0, 0, 9, 0, 0, 0, 3, 0, 0, 0],
                    )]),
                ),
            ]),
        );
        let words = encode_event(&node).unwrap();
        assert_eq!(decode_event(&words).unwrap(), node);
    }

    #[test]
    fn overrunning_child_rejected() {
        assert!(matches!(
            decode_event(&[3, 0x0001_0e00, 5, 0x0001_0100]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn decoder_tracks_position() {
        let words = [1, 0x0001_0100, 1, 0x0002_0100, 2, 0x0003_0100];
        let mut decoder = EventDecoder::new(&words);
        assert_eq!(decoder.decode(ContainerKind::Bank).unwrap().tag, 1);
        assert_eq!(decoder.position(), 2);
        assert_eq!(decoder.decode(ContainerKind::Bank).unwrap().tag, 2);
        assert!(!decoder.is_at_end());
    }

    proptest! {
        #[test]
        fn int16_payload_round_trips(values in prop::collection::vec(any::<i16>(), 0..64)) {
            let node = Node::bank(3, 1, Payload::Int16(values));
            let words = encode_event(&node).unwrap();
            prop_assert_eq!(decode_event(&words).unwrap(), node);
        }

        #[test]
        fn strings_round_trip(strings in prop::collection::vec("[a-zA-Z0-9 ]{1,12}", 1..6)) {
            let node = Node::bank(3, 1, Payload::Strings(strings));
            let words = encode_event(&node).unwrap();
            prop_assert_eq!(decode_event(&words).unwrap(), node);
        }
    }
}
