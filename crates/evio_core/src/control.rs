//! Runtime configuration requests.

use crate::config::HEADER_WORDS;
use crate::error::{EvioError, EvioResult};
use std::str::FromStr;

/// A configuration request sent to an open session.
///
/// Setters apply to writers only. Getters work on every session kind
/// except where noted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Target block size in words (`b`).
    BlockSize(u32),
    /// Write buffer size in words (`w`), file and socket writers only.
    BufferSize(u32),
    /// Maximum events per block (`n`).
    MaxEvents(u32),
    /// Split threshold in bytes (`s`).
    SplitSize(u64),
    /// Run number used in file names (`r`).
    RunNumber(u32),
    /// Run type used in file names (`t`).
    RunType(String),
    /// Format version (`v`).
    Version,
    /// Current block header words (`h`).
    Header,
    /// Total events in the stream (`e`), not for sockets.
    EventCount,
    /// Block sequence mismatches seen so far, readers only.
    SequenceMismatches,
}

impl Control {
    /// Builds a request from its one-letter tag and, for setters, a value.
    ///
    /// # Errors
    ///
    /// - [`EvioError::UnknownOption`] for an unknown tag
    /// - [`EvioError::BadArgument`] if a setter value is missing or is not
    ///   a number
    pub fn parse(tag: &str, value: Option<&str>) -> EvioResult<Self> {
        let tag = tag.to_ascii_lowercase();
        let control = match tag.as_str() {
            "b" => Self::BlockSize(number(&tag, value)?),
            "w" => Self::BufferSize(number(&tag, value)?),
            "n" => Self::MaxEvents(number(&tag, value)?),
            "s" => Self::SplitSize(number(&tag, value)?),
            "r" => Self::RunNumber(number(&tag, value)?),
            "t" => Self::RunType(
                value
                    .ok_or_else(|| EvioError::bad_argument("run type needs a value"))?
                    .to_owned(),
            ),
            "v" => Self::Version,
            "h" => Self::Header,
            "e" => Self::EventCount,
            _ => return Err(EvioError::UnknownOption { option: tag }),
        };
        Ok(control)
    }

    /// Returns true for requests that change settings.
    #[must_use]
    pub const fn is_setter(&self) -> bool {
        matches!(
            self,
            Self::BlockSize(_)
                | Self::BufferSize(_)
                | Self::MaxEvents(_)
                | Self::SplitSize(_)
                | Self::RunNumber(_)
                | Self::RunType(_)
        )
    }
}

fn number<T: FromStr>(tag: &str, value: Option<&str>) -> EvioResult<T> {
    let value = value.ok_or_else(|| EvioError::bad_argument(format!("option {tag} needs a value")))?;
    value
        .trim()
        .parse()
        .map_err(|_| EvioError::bad_argument(format!("option {tag}: {value:?} is not a number")))
}

/// The answer to a [`Control`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    /// The setting was applied as given.
    Done,
    /// The setting was applied with this (clamped) value.
    Applied(u32),
    /// Format version.
    Version(u32),
    /// Block header words.
    Header([u32; HEADER_WORDS]),
    /// Event count.
    EventCount(u64),
    /// Sequence mismatch count.
    SequenceMismatches(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags() {
        assert_eq!(Control::parse("b", Some("1000")).unwrap(), Control::BlockSize(1000));
        assert_eq!(Control::parse("S", Some(" 4096 ")).unwrap(), Control::SplitSize(4096));
        assert_eq!(
            Control::parse("t", Some("cosmic")).unwrap(),
            Control::RunType("cosmic".into())
        );
        assert_eq!(Control::parse("v", None).unwrap(), Control::Version);
        assert!(!Control::parse("e", None).unwrap().is_setter());
    }

    #[test]
    fn parse_failures() {
        assert!(matches!(
            Control::parse("q", None),
            Err(EvioError::UnknownOption { .. })
        ));
        assert!(matches!(
            Control::parse("n", None),
            Err(EvioError::BadArgument { .. })
        ));
        assert!(matches!(
            Control::parse("r", Some("-1")),
            Err(EvioError::BadArgument { .. })
        ));
    }
}
