//! Dictionary events.
//!
//! A dictionary is an XML description of the tags used in a stream. It is
//! stored as a string bank (tag 0, num 0) in a block of its own at the head
//! of every file, flagged in the block header and left out of event counts.

use crate::error::{EvioError, EvioResult};
use evio_codec::{decode_event, encode_event, Node, Payload};

/// Shortest dictionary accepted, in bytes.
pub const MIN_DICTIONARY_BYTES: usize = 35;

/// Builds the event words carrying `xml`.
///
/// # Errors
///
/// Returns [`EvioError::BadArgument`] if `xml` is shorter than
/// [`MIN_DICTIONARY_BYTES`] bytes or contains a NUL, which would split it
/// into several strings on the wire.
pub fn encode_dictionary(xml: &str) -> EvioResult<Vec<u32>> {
    if xml.len() < MIN_DICTIONARY_BYTES {
        return Err(EvioError::bad_argument(format!(
            "dictionary of {} bytes is shorter than {MIN_DICTIONARY_BYTES}",
            xml.len()
        )));
    }
    if let Some(at) = xml.find('\0') {
        return Err(EvioError::bad_argument(format!(
            "dictionary holds a NUL at byte {at}"
        )));
    }
    let event = Node::bank(0, 0, Payload::Strings(vec![xml.to_owned()]));
    Ok(encode_event(&event)?)
}

/// Extracts the dictionary text from host-order event words.
///
/// # Errors
///
/// Returns [`EvioError::BadFile`] if the event is not a string bank holding
/// exactly one string.
pub fn decode_dictionary(words: &[u32]) -> EvioResult<String> {
    match decode_event(words)?.payload {
        Payload::Strings(mut strings) if strings.len() == 1 => Ok(strings.swap_remove(0)),
        Payload::Strings(strings) => Err(EvioError::bad_file(format!(
            "dictionary event holds {} strings",
            strings.len()
        ))),
        other => Err(EvioError::bad_file(format!(
            "dictionary event holds {} data",
            other.data_type().name()
        ))),
    }
}
