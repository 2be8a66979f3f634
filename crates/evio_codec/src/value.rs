//! In-memory event tree.
//!
//! A [`Node`] is one structure (bank, segment or tagsegment) with a typed
//! [`Payload`]. Trees are built by hand or by [`crate::EventDecoder`], and
//! turned back into words by [`crate::EventEncoder`].

use crate::types::{ContainerKind, DataType};
use serde::Serialize;

/// One record of a composite payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeItem {
    /// Format string describing `data`.
    pub format: String,
    /// Tag of the format tagsegment.
    pub format_tag: u16,
    /// Tag of the data bank.
    pub data_tag: u16,
    /// Num of the data bank.
    pub data_num: u8,
    /// Record bytes in local order.
    pub data: Vec<u8>,
}

impl CompositeItem {
    /// Creates a record with zero tags.
    pub fn new(format: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            format: format.into(),
            format_tag: 0,
            data_tag: 0,
            data_num: 0,
            data,
        }
    }
}

/// Typed contents of a structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Payload {
    /// Untyped words.
    Unknown32(Vec<u32>),
    /// Unsigned 32-bit integers.
    UInt32(Vec<u32>),
    /// Single precision floats.
    Float32(Vec<f32>),
    /// A list of strings.
    Strings(Vec<String>),
    /// Signed 16-bit integers.
    Int16(Vec<i16>),
    /// Unsigned 16-bit integers.
    UInt16(Vec<u16>),
    /// Signed bytes.
    Int8(Vec<i8>),
    /// Unsigned bytes.
    UInt8(Vec<u8>),
    /// Double precision floats.
    Float64(Vec<f64>),
    /// Signed 64-bit integers.
    Int64(Vec<i64>),
    /// Unsigned 64-bit integers.
    UInt64(Vec<u64>),
    /// Signed 32-bit integers.
    Int32(Vec<i32>),
    /// Child banks.
    Banks(Vec<Node>),
    /// Child segments.
    Segments(Vec<Node>),
    /// Child tagsegments.
    TagSegments(Vec<Node>),
    /// Composite records.
    Composite(Vec<CompositeItem>),
    /// Words of an undefined type code, kept verbatim.
    Raw {
        /// The type code.
        code: u8,
        /// Payload words.
        words: Vec<u32>,
    },
}

impl Payload {
    /// Type code announced in the structure header.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Unknown32(_) => DataType::Unknown32,
            Self::UInt32(_) => DataType::UInt32,
            Self::Float32(_) => DataType::Float32,
            Self::Strings(_) => DataType::String,
            Self::Int16(_) => DataType::Int16,
            Self::UInt16(_) => DataType::UInt16,
            Self::Int8(_) => DataType::Int8,
            Self::UInt8(_) => DataType::UInt8,
            Self::Float64(_) => DataType::Float64,
            Self::Int64(_) => DataType::Int64,
            Self::UInt64(_) => DataType::UInt64,
            Self::Int32(_) => DataType::Int32,
            Self::Banks(_) => DataType::Bank,
            Self::Segments(_) => DataType::Segment,
            Self::TagSegments(_) => DataType::TagSegment,
            Self::Composite(_) => DataType::Composite,
            Self::Raw { code, .. } => DataType::Other(*code),
        }
    }

    /// Child structures, if this payload is a container.
    #[must_use]
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Self::Banks(c) | Self::Segments(c) | Self::TagSegments(c) => Some(c),
            _ => None,
        }
    }

    /// Number of elements (children for containers).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Unknown32(v) | Self::UInt32(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Strings(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::UInt8(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Banks(v) | Self::Segments(v) | Self::TagSegments(v) => v.len(),
            Self::Composite(v) => v.len(),
            Self::Raw { words, .. } => words.len(),
        }
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A structure in an event tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Header shape.
    pub kind: ContainerKind,
    /// Tag.
    pub tag: u16,
    /// Bank number; always 0 for segments and tagsegments.
    pub num: u8,
    /// Contents.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Node {
    /// Creates a bank.
    #[must_use]
    pub const fn bank(tag: u16, num: u8, payload: Payload) -> Self {
        Self {
            kind: ContainerKind::Bank,
            tag,
            num,
            payload,
        }
    }

    /// Creates a segment.
    #[must_use]
    pub const fn segment(tag: u8, payload: Payload) -> Self {
        Self {
            kind: ContainerKind::Segment,
            tag: tag as u16,
            num: 0,
            payload,
        }
    }

    /// Creates a tagsegment.
    #[must_use]
    pub const fn tagsegment(tag: u16, payload: Payload) -> Self {
        Self {
            kind: ContainerKind::TagSegment,
            tag,
            num: 0,
            payload,
        }
    }

    /// Payload type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.payload.data_type()
    }

    /// Depth-first iterator over this node and all its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            if let Some(children) = node.payload.children() {
                stack.extend(children.iter().rev());
            }
            Some(node)
        })
    }

    /// First structure in the tree (including this one) with the given tag.
    #[must_use]
    pub fn find_tag(&self, tag: u16) -> Option<&Node> {
        self.iter().find(|node| node.tag == tag)
    }
}
