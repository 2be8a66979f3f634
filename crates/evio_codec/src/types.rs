//! Data type codes and structure headers.
//!
//! Every structure starts with a header that packs a length, a tag and a
//! 6-bit (4-bit for tagsegments) data type code. The type code decides how
//! the payload is interpreted: as a flat array of primitives, as a list of
//! child structures, or as a composite record described by a format string.

use crate::error::{CodecError, CodecResult};
use serde::Serialize;
use std::fmt;

/// Content type of a structure's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Untyped 32-bit words.
    Unknown32,
    /// Unsigned 32-bit integers.
    UInt32,
    /// IEEE 754 single precision.
    Float32,
    /// NUL-separated strings padded with `0x04`.
    String,
    /// Signed 16-bit integers.
    Int16,
    /// Unsigned 16-bit integers.
    UInt16,
    /// Signed 8-bit integers.
    Int8,
    /// Unsigned 8-bit integers.
    UInt8,
    /// IEEE 754 double precision.
    Float64,
    /// Signed 64-bit integers.
    Int64,
    /// Unsigned 64-bit integers.
    UInt64,
    /// Signed 32-bit integers.
    Int32,
    /// Children are tagsegments.
    TagSegment,
    /// Children are segments.
    Segment,
    /// Children are banks.
    Bank,
    /// Composite records (format string + data bank).
    Composite,
    /// A code with no defined meaning; the payload is copied untouched.
    Other(u8),
}

/// How a payload must be byte-swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapClass {
    /// Bytes are order-independent.
    Bytes,
    /// 16-bit elements.
    Half,
    /// 32-bit elements.
    Word,
    /// 64-bit elements.
    Double,
    /// Child structures with the given header shape.
    Container(ContainerKind),
    /// Composite records.
    Composite,
}

impl DataType {
    /// Decodes a type code. Codes `0x10` and `0x20` are the alternate
    /// spellings of bank and segment.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x0 => Self::Unknown32,
            0x1 => Self::UInt32,
            0x2 => Self::Float32,
            0x3 => Self::String,
            0x4 => Self::Int16,
            0x5 => Self::UInt16,
            0x6 => Self::Int8,
            0x7 => Self::UInt8,
            0x8 => Self::Float64,
            0x9 => Self::Int64,
            0xa => Self::UInt64,
            0xb => Self::Int32,
            0xc => Self::TagSegment,
            0xd | 0x20 => Self::Segment,
            0xe | 0x10 => Self::Bank,
            0xf => Self::Composite,
            other => Self::Other(other),
        }
    }

    /// Returns the canonical type code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unknown32 => 0x0,
            Self::UInt32 => 0x1,
            Self::Float32 => 0x2,
            Self::String => 0x3,
            Self::Int16 => 0x4,
            Self::UInt16 => 0x5,
            Self::Int8 => 0x6,
            Self::UInt8 => 0x7,
            Self::Float64 => 0x8,
            Self::Int64 => 0x9,
            Self::UInt64 => 0xa,
            Self::Int32 => 0xb,
            Self::TagSegment => 0xc,
            Self::Segment => 0xd,
            Self::Bank => 0xe,
            Self::Composite => 0xf,
            Self::Other(code) => code,
        }
    }

    /// Returns the conventional lower-case name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown32 => "unknown32",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
            Self::String => "string",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Float64 => "float64",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Int32 => "int32",
            Self::TagSegment => "tagsegment",
            Self::Segment => "segment",
            Self::Bank => "bank",
            Self::Composite => "composite",
            Self::Other(_) => "unknown",
        }
    }

    /// Returns true if the payload is a list of child structures.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Bank | Self::Segment | Self::TagSegment)
    }

    /// Returns how the payload must be swapped.
    #[must_use]
    pub const fn swap_class(self) -> SwapClass {
        match self {
            Self::UInt32 | Self::Float32 | Self::Int32 => SwapClass::Word,
            Self::Int16 | Self::UInt16 => SwapClass::Half,
            Self::Float64 | Self::Int64 | Self::UInt64 => SwapClass::Double,
            Self::Bank => SwapClass::Container(ContainerKind::Bank),
            Self::Segment => SwapClass::Container(ContainerKind::Segment),
            Self::TagSegment => SwapClass::Container(ContainerKind::TagSegment),
            Self::Composite => SwapClass::Composite,
            Self::Unknown32 | Self::String | Self::Int8 | Self::UInt8 | Self::Other(_) => {
                SwapClass::Bytes
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The three nesting structure shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Two-word header: length, then tag/type/num.
    Bank,
    /// One-word header: 8-bit tag, 6-bit type, 16-bit length.
    Segment,
    /// One-word header: 12-bit tag, 4-bit type, 16-bit length.
    TagSegment,
}

impl ContainerKind {
    /// Number of header words.
    #[must_use]
    pub const fn header_words(self) -> usize {
        match self {
            Self::Bank => 2,
            Self::Segment | Self::TagSegment => 1,
        }
    }

    /// The type code a parent uses to declare children of this kind.
    #[must_use]
    pub const fn data_type(self) -> DataType {
        match self {
            Self::Bank => DataType::Bank,
            Self::Segment => DataType::Segment,
            Self::TagSegment => DataType::TagSegment,
        }
    }

    /// Extracts the length field from the first header word.
    ///
    /// The length counts the words that follow the first header word.
    #[must_use]
    pub const fn length_of(self, first_word: u32) -> usize {
        match self {
            Self::Bank => first_word as usize,
            Self::Segment | Self::TagSegment => (first_word & 0xffff) as usize,
        }
    }
}

/// A decoded structure header, independent of its on-wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StructureHeader {
    /// Header shape.
    pub kind: ContainerKind,
    /// Words following the first header word.
    pub length: u32,
    /// Tag (16 bits for banks, 8 for segments, 12 for tagsegments).
    pub tag: u16,
    /// Payload type.
    pub data_type: DataType,
    /// Padding bytes at the end of 8/16-bit payloads (banks and segments only).
    pub padding: u8,
    /// Bank number (banks only).
    pub num: u8,
}

impl StructureHeader {
    /// Decodes a header of the given shape from host-order words.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if `words` is shorter than the header.
    pub fn decode(kind: ContainerKind, words: &[u32]) -> CodecResult<Self> {
        if words.len() < kind.header_words() {
            return Err(CodecError::truncated(kind.header_words(), words.len()));
        }
        let w0 = words[0];
        let header = match kind {
            ContainerKind::Bank => {
                let w1 = words[1];
                Self {
                    kind,
                    length: w0,
                    tag: (w1 >> 16) as u16,
                    data_type: DataType::from_code(((w1 >> 8) & 0x3f) as u8),
                    padding: ((w1 >> 14) & 0x3) as u8,
                    num: (w1 & 0xff) as u8,
                }
            }
            ContainerKind::Segment => Self {
                kind,
                length: w0 & 0xffff,
                tag: (w0 >> 24) as u16,
                data_type: DataType::from_code(((w0 >> 16) & 0x3f) as u8),
                padding: ((w0 >> 22) & 0x3) as u8,
                num: 0,
            },
            ContainerKind::TagSegment => Self {
                kind,
                length: w0 & 0xffff,
                tag: (w0 >> 20) as u16,
                data_type: DataType::from_code(((w0 >> 16) & 0xf) as u8),
                padding: 0,
                num: 0,
            },
        };
        Ok(header)
    }

    /// Encodes the header into host-order words.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::FieldOutOfRange`] if a field does not fit the
    /// header shape.
    pub fn encode(&self) -> CodecResult<Vec<u32>> {
        let code = u32::from(self.data_type.code());
        let padding = u32::from(self.padding & 0x3);
        match self.kind {
            ContainerKind::Bank => {
                check_range("bank type", code, 0x3f)?;
                let w1 = (u32::from(self.tag) << 16)
                    | (((padding << 6) | code) << 8)
                    | u32::from(self.num);
                Ok(vec![self.length, w1])
            }
            ContainerKind::Segment => {
                check_range("segment tag", u32::from(self.tag), 0xff)?;
                check_range("segment type", code, 0x3f)?;
                check_range("segment length", self.length, 0xffff)?;
                Ok(vec![
                    (u32::from(self.tag) << 24) | (((padding << 6) | code) << 16) | self.length,
                ])
            }
            ContainerKind::TagSegment => {
                check_range("tagsegment tag", u32::from(self.tag), 0xfff)?;
                check_range("tagsegment type", code, 0xf)?;
                check_range("tagsegment length", self.length, 0xffff)?;
                Ok(vec![
                    (u32::from(self.tag) << 20) | (code << 16) | self.length,
                ])
            }
        }
    }

    /// Number of payload words.
    #[must_use]
    pub fn data_words(&self) -> usize {
        (self.length as usize + 1).saturating_sub(self.kind.header_words())
    }

    /// Total words including the header.
    #[must_use]
    pub fn total_words(&self) -> usize {
        self.length as usize + 1
    }
}

fn check_range(field: &'static str, value: u32, max: u32) -> CodecResult<()> {
    if value > max {
        return Err(CodecError::FieldOutOfRange {
            field,
            value: u64::from(value),
            max: u64::from(max),
        });
    }
    Ok(())
}
