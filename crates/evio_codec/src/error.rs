//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while swapping, encoding or decoding events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A declared length runs past the end of the available words.
    #[error("structure truncated: needs {needed} words, only {available} available")]
    Truncated {
        /// Words the structure claims to need.
        needed: usize,
        /// Words actually available.
        available: usize,
    },

    /// A header is structurally invalid.
    #[error("invalid header: {message}")]
    InvalidHeader {
        /// Description of the problem.
        message: String,
    },

    /// A header field does not fit its bit width.
    #[error("{field} value {value} exceeds maximum {max}")]
    FieldOutOfRange {
        /// Name of the field.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Largest allowed value.
        max: u64,
    },

    /// String data is not valid UTF-8.
    #[error("invalid UTF-8 string data")]
    InvalidUtf8,

    /// A composite format string failed to compile.
    #[error("composite format error: {0}")]
    Format(#[from] FormatError),
}

impl CodecError {
    /// Creates an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Creates a truncation error.
    #[must_use]
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated { needed, available }
    }
}

/// Errors produced by the composite format compiler.
///
/// `position` is the byte offset of the offending character in the format
/// string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A repeat count follows an item without a separating comma.
    #[error("repeat count at {position} must follow '(' or ','")]
    MisplacedRepeat {
        /// Offending position.
        position: usize,
    },

    /// A repeat count is larger than 15.
    #[error("repeat count at {position} exceeds 15")]
    RepeatTooLarge {
        /// Offending position.
        position: usize,
    },

    /// A group opens directly after an item.
    #[error("'(' at {position} must follow '(', ',' or a repeat count")]
    MisplacedOpen {
        /// Offending position.
        position: usize,
    },

    /// A group closes with no item before it.
    #[error("')' at {position} must follow an item or ')'")]
    MisplacedClose {
        /// Offending position.
        position: usize,
    },

    /// A comma appears where an item was expected.
    #[error("',' at {position} must follow an item or ')'")]
    MisplacedComma {
        /// Offending position.
        position: usize,
    },

    /// Two items appear without a comma between them.
    #[error("item at {position} must follow '(', ',' or a repeat count")]
    MisplacedItem {
        /// Offending position.
        position: usize,
    },

    /// An unsupported character.
    #[error("unknown character {character:?} at {position}")]
    UnknownCharacter {
        /// Offending character.
        character: char,
        /// Offending position.
        position: usize,
    },

    /// Parentheses do not balance.
    #[error("unmatched parentheses")]
    UnbalancedParentheses,

    /// The format contains no items.
    #[error("empty format")]
    Empty,
}
