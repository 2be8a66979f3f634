//! Event tree encoder.
//!
//! Produces host-order words. 8- and 16-bit payloads are packed in memory
//! order and padded to a word boundary; the pad byte count is recorded in the
//! header (banks and segments only, tagsegments have no room for it).
//! String payloads end each string with a NUL and pad with `0x04` bytes.

use crate::error::{CodecError, CodecResult};
use crate::format::CompiledFormat;
use crate::types::{ContainerKind, DataType, StructureHeader};
use crate::value::{CompositeItem, Node, Payload};
use bytes::{BufMut, BytesMut};

/// Encodes an event. The root must be a bank.
///
/// # Errors
///
/// Returns an error if the root is not a bank, a header field does not fit,
/// or a composite format does not compile.
pub fn encode_event(node: &Node) -> CodecResult<Vec<u32>> {
    if node.kind != ContainerKind::Bank {
        return Err(CodecError::invalid_header("an event must be a bank"));
    }
    let mut encoder = EventEncoder::new();
    encoder.encode(node)?;
    Ok(encoder.into_words())
}

/// Packs a list of strings into string-typed payload bytes.
#[must_use]
pub fn pack_strings<S: AsRef<str>>(strings: &[S]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for s in strings {
        bytes.extend_from_slice(s.as_ref().as_bytes());
        bytes.push(0);
    }
    let pad = [4, 3, 2, 1][bytes.len() % 4];
    bytes.resize(bytes.len() + pad, 0x04);
    bytes
}

/// Converts bytes to host-order words, zero-filling the last word.
#[must_use]
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_ne_bytes(word)
        })
        .collect()
}

/// Streaming event encoder.
#[derive(Debug, Default)]
pub struct EventEncoder {
    words: Vec<u32>,
}

impl EventEncoder {
    /// Creates an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one structure.
    ///
    /// # Errors
    ///
    /// See [`encode_event`].
    pub fn encode(&mut self, node: &Node) -> CodecResult<()> {
        let start = self.words.len();
        let header_words = node.kind.header_words();
        self.words.resize(start + header_words, 0);

        let padding = self.encode_payload(node.kind, &node.payload)?;

        let total = self.words.len() - start;
        let length = u32::try_from(total - 1).map_err(|_| CodecError::FieldOutOfRange {
            field: "length",
            value: (total - 1) as u64,
            max: u64::from(u32::MAX),
        })?;
        let header = StructureHeader {
            kind: node.kind,
            length,
            tag: node.tag,
            data_type: node.data_type(),
            padding,
            num: node.num,
        };
        let encoded = header.encode()?;
        self.words[start..start + header_words].copy_from_slice(&encoded);
        Ok(())
    }

    /// Returns the encoded words.
    #[must_use]
    pub fn into_words(self) -> Vec<u32> {
        self.words
    }

    /// Words written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Writes the payload and returns the header padding count.
    fn encode_payload(&mut self, kind: ContainerKind, payload: &Payload) -> CodecResult<u8> {
        let mut buf = BytesMut::new();
        match payload {
            Payload::Unknown32(v) | Payload::UInt32(v) => self.words.extend_from_slice(v),
            Payload::Raw { words, .. } => self.words.extend_from_slice(words),
            Payload::Int32(v) => v.iter().for_each(|x| buf.put_i32_ne(*x)),
            Payload::Float32(v) => v.iter().for_each(|x| buf.put_f32_ne(*x)),
            Payload::Float64(v) => v.iter().for_each(|x| buf.put_f64_ne(*x)),
            Payload::Int64(v) => v.iter().for_each(|x| buf.put_i64_ne(*x)),
            Payload::UInt64(v) => v.iter().for_each(|x| buf.put_u64_ne(*x)),
            Payload::Int16(v) => v.iter().for_each(|x| buf.put_i16_ne(*x)),
            Payload::UInt16(v) => v.iter().for_each(|x| buf.put_u16_ne(*x)),
            Payload::Int8(v) => v.iter().for_each(|x| buf.put_i8(*x)),
            Payload::UInt8(v) => buf.put_slice(v),
            Payload::Strings(v) => buf.put_slice(&pack_strings(v)),
            Payload::Banks(children)
            | Payload::Segments(children)
            | Payload::TagSegments(children) => {
                let expected = payload.data_type();
                for child in children {
                    if child.kind.data_type() != expected {
                        return Err(CodecError::invalid_header(format!(
                            "{} child inside a {expected} container",
                            child.kind.data_type()
                        )));
                    }
                    self.encode(child)?;
                }
            }
            Payload::Composite(items) => {
                for item in items {
                    self.encode_composite(item)?;
                }
            }
        }

        let padding = (4 - buf.len() % 4) % 4;
        self.words.extend(bytes_to_words(&buf));
        // Tagsegments cannot record padding.
        let padding = if kind == ContainerKind::TagSegment {
            0
        } else {
            padding as u8
        };
        Ok(padding)
    }

    fn encode_composite(&mut self, item: &CompositeItem) -> CodecResult<()> {
        CompiledFormat::compile(&item.format)?;

        let format = Node::tagsegment(item.format_tag, Payload::Strings(vec![item.format.clone()]));
        self.encode(&format)?;

        let data = Node::bank(item.data_tag, item.data_num, Payload::UInt8(item.data.clone()));
        let start = self.words.len();
        self.encode(&data)?;
        // The data bank is typed as untyped words; the format says what is inside.
        let mut header = StructureHeader::decode(ContainerKind::Bank, &self.words[start..start + 2])?;
        header.data_type = DataType::Unknown32;
        let encoded = header.encode()?;
        self.words[start..start + 2].copy_from_slice(&encoded);
        Ok(())
    }
}
