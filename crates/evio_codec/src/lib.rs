//! # EVIO Codec
//!
//! Event structures and byte-order handling for the EVIO container format.
//!
//! An event is a tree of structures. Each structure has a one- or two-word
//! header (bank, segment or tagsegment) and a payload whose interpretation is
//! selected by a type code: primitive arrays, strings, child structures, or
//! composite records described by a small format language.
//!
//! ## Design Principles
//!
//! - Events are held as `u32` words whose in-memory bytes equal the stream
//!   bytes; nothing here depends on the host byte order
//! - Swapping is pure and involutive: swapping to foreign order and back
//!   restores the input exactly
//! - Every declared length is bounds-checked before it is trusted
//!
//! ## Available Modules
//!
//! - [`swap`]: structure-aware endian swapping
//! - [`format`]: composite format compiler
//! - [`composite`]: composite data interpreter
//! - [`types`]: data type codes and structure headers
//! - event tree encode/decode via [`Node`], [`EventEncoder`], [`EventDecoder`]
//!
//! ## Example
//!
//! ```
//! use evio_codec::{decode_event, encode_event, swap_event, Node, Payload, SwapDirection};
//!
//! let event = Node::bank(1, 0, Payload::Int32(vec![-1, 2, 3]));
//! let mut words = encode_event(&event).unwrap();
//!
//! swap_event(&mut words, SwapDirection::ToForeign).unwrap();
//! swap_event(&mut words, SwapDirection::ToLocal).unwrap();
//!
//! assert_eq!(decode_event(&words).unwrap(), event);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod composite;
mod decoder;
mod encoder;
mod error;
pub mod format;
pub mod swap;
pub mod types;
mod value;

pub use composite::swap_composite_bytes;
pub use decoder::{decode_event, unpack_strings, words_to_bytes, EventDecoder};
pub use encoder::{bytes_to_words, encode_event, pack_strings, EventEncoder};
pub use error::{CodecError, CodecResult, FormatError};
pub use format::{CompiledFormat, Item};
pub use swap::{swap_event, swapped_event, SwapDirection};
pub use types::{ContainerKind, DataType, StructureHeader, SwapClass};
pub use value::{CompositeItem, Node, Payload};

/// Types that can be written as event words.
pub trait Encode {
    /// Encodes into host-order words.
    fn encode(&self) -> CodecResult<Vec<u32>>;
}

/// Types that can be read from event words.
pub trait Decode: Sized {
    /// Decodes from host-order words.
    fn decode(words: &[u32]) -> CodecResult<Self>;
}

impl Encode for Node {
    fn encode(&self) -> CodecResult<Vec<u32>> {
        encode_event(self)
    }
}

impl Decode for Node {
    fn decode(words: &[u32]) -> CodecResult<Self> {
        decode_event(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_traits_round_trip() {
        let node = Node::bank(4, 2, Payload::UInt64(vec![u64::MAX, 7]));
        let words = node.encode().unwrap();
        assert_eq!(Node::decode(&words).unwrap(), node);
    }

    #[test]
    fn composite_event_swaps_back() {
        let data: Vec<u8> = [2u32, 5, 6]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .chain(1.25f64.to_ne_bytes())
            .collect();
        let node = Node::bank(
            1,
            0,
            Payload::Composite(vec![CompositeItem::new("i,2s,i,D", data)]),
        );
        let original = node.encode().unwrap();
        let foreign = swapped_event(&original, SwapDirection::ToForeign).unwrap();
        assert_ne!(foreign, original);
        let back = swapped_event(&foreign, SwapDirection::ToLocal).unwrap();
        assert_eq!(back, original);
    }
}
