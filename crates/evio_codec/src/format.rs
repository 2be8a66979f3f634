//! Composite format compiler.
//!
//! A composite format string describes the layout of a composite record in
//! a tiny Fortran-like language:
//!
//! ```text
//! i  F  a  S  s  C  c  D  L  l  I  A      items (see [`Item`])
//! 3i                                      repeat an item 3 times (max 15)
//! 2(i,D)                                  repeat a group
//! N(i)  Ni                                read the repeat count from the data
//! ```
//!
//! Compilation turns the string into one byte per token:
//!
//! - `16 * count + item` for an item (`count` is 0 when read from data)
//! - `16 * count` for `(` (or `15` when the count is read from data)
//! - `0` for `)`

use crate::error::{CodecError, CodecResult, FormatError};
use std::fmt;
use std::str::FromStr;

/// Code emitted for a group whose count comes from the data.
pub const RUNTIME_GROUP: u8 = 0x0f;

/// Code emitted for a closing parenthesis.
pub const GROUP_END: u8 = 0x00;

/// Largest literal repeat count.
pub const MAX_REPEAT: u8 = 15;

/// A primitive item in a composite format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    /// `i`: 32-bit unsigned integer.
    UInt32 = 1,
    /// `F`: 32-bit float.
    Float32 = 2,
    /// `a`: 8-bit ASCII character.
    Char = 3,
    /// `S`: 16-bit signed integer.
    Int16 = 4,
    /// `s`: 16-bit unsigned integer.
    UInt16 = 5,
    /// `C`: 8-bit signed integer.
    Int8 = 6,
    /// `c`: 8-bit unsigned integer.
    UInt8 = 7,
    /// `D`: 64-bit float.
    Float64 = 8,
    /// `L`: 64-bit signed integer.
    Int64 = 9,
    /// `l`: 64-bit unsigned integer.
    UInt64 = 10,
    /// `I`: 32-bit signed integer.
    Int32 = 11,
    /// `A`: 32-bit hollerit.
    Hollerit = 12,
}

impl Item {
    /// Maps a format letter to its item.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        Some(match letter {
            'i' => Self::UInt32,
            'F' => Self::Float32,
            'a' => Self::Char,
            'S' => Self::Int16,
            's' => Self::UInt16,
            'C' => Self::Int8,
            'c' => Self::UInt8,
            'D' => Self::Float64,
            'L' => Self::Int64,
            'l' => Self::UInt64,
            'I' => Self::Int32,
            'A' => Self::Hollerit,
            _ => return None,
        })
    }

    /// Maps an item code (1..=12) back to the item.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::UInt32,
            2 => Self::Float32,
            3 => Self::Char,
            4 => Self::Int16,
            5 => Self::UInt16,
            6 => Self::Int8,
            7 => Self::UInt8,
            8 => Self::Float64,
            9 => Self::Int64,
            10 => Self::UInt64,
            11 => Self::Int32,
            12 => Self::Hollerit,
            _ => return None,
        })
    }

    /// Element width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Char | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::UInt32 | Self::Float32 | Self::Int32 | Self::Hollerit => 4,
            Self::Float64 | Self::Int64 | Self::UInt64 => 8,
        }
    }
}

/// A compiled composite format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormat {
    codes: Vec<u8>,
}

impl CompiledFormat {
    /// Compiles a format string.
    ///
    /// Spaces are ignored. Compilation is all-or-nothing: on error no codes
    /// are produced.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] describing the first offending token.
    pub fn compile(format: &str) -> Result<Self, FormatError> {
        // `repeat` is the pending count: Some(n) while a count may still be
        // given (n = 0 means none yet), None right after an item or ')'.
        let mut repeat: Option<u8> = Some(0);
        let mut from_data = false;
        let mut depth = 0usize;
        let mut codes = Vec::with_capacity(format.len());

        for (position, character) in format.char_indices() {
            match character {
                ' ' => {}
                '0'..='9' => {
                    let current = repeat.ok_or(FormatError::MisplacedRepeat { position })?;
                    let digit = character as u8 - b'0';
                    let next = u16::from(current) * 10 + u16::from(digit);
                    if next > u16::from(MAX_REPEAT) {
                        return Err(FormatError::RepeatTooLarge { position });
                    }
                    repeat = Some(next as u8);
                }
                '(' => {
                    let count = repeat.ok_or(FormatError::MisplacedOpen { position })?;
                    codes.push(if from_data {
                        RUNTIME_GROUP
                    } else {
                        16 * count.max(1)
                    });
                    depth += 1;
                    from_data = false;
                    repeat = Some(0);
                }
                ')' => {
                    if repeat.is_some() {
                        return Err(FormatError::MisplacedClose { position });
                    }
                    if depth == 0 {
                        return Err(FormatError::UnbalancedParentheses);
                    }
                    codes.push(GROUP_END);
                    depth -= 1;
                    repeat = None;
                }
                ',' => {
                    if repeat.is_some() {
                        return Err(FormatError::MisplacedComma { position });
                    }
                    repeat = Some(0);
                }
                'N' => from_data = true,
                letter => {
                    let item = Item::from_letter(letter).ok_or(FormatError::UnknownCharacter {
                        character: letter,
                        position,
                    })?;
                    let count = repeat.ok_or(FormatError::MisplacedItem { position })?;
                    let count = if from_data { count } else { count.max(1) };
                    codes.push(16 * count + item as u8);
                    from_data = false;
                    repeat = None;
                }
            }
        }

        if depth != 0 {
            return Err(FormatError::UnbalancedParentheses);
        }
        if codes.is_empty() {
            return Err(FormatError::Empty);
        }
        Ok(Self { codes })
    }

    /// Compiles a format string stored as string data: bytes up to the first
    /// NUL, taken from host-order words.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not UTF-8 or the format is invalid.
    pub fn from_words(words: &[u32]) -> CodecResult<Self> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = std::str::from_utf8(&bytes[..end]).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(Self::compile(text.trim_end_matches('\u{4}'))?)
    }

    /// Returns the compiled codes.
    #[must_use]
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Number of codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Always false: empty formats fail to compile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromStr for CompiledFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for CompiledFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.codes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{code:#04x}")?;
        }
        Ok(())
    }
}
