//! In-memory block accumulation.

use crate::block::{slot, BlockHeader, DICTIONARY_BIT};
use crate::config::HEADER_WORDS;

/// Words waiting to be written, always ending in an empty last-block
/// header.
///
/// Each append overwrites the trailing header with the event (opening a
/// block first when asked) and writes a fresh trailing header after it, so
/// the buffer is a complete, valid stream tail after every call.
#[derive(Debug)]
pub(crate) struct BlockBuffer {
    words: Vec<u32>,
    current: usize,
    open_block: bool,
    dictionary_block: bool,
    block_events: u32,
    next_number: u32,
}

impl BlockBuffer {
    pub fn new(first_number: u32) -> Self {
        let mut buffer = Self {
            words: Vec::new(),
            current: 0,
            open_block: false,
            dictionary_block: false,
            block_events: 0,
            next_number: first_number,
        };
        buffer.reset(first_number);
        buffer
    }

    /// Drops everything, leaving only a trailing header numbered `number`.
    pub fn reset(&mut self, number: u32) {
        self.words.clear();
        self.words
            .extend_from_slice(&BlockHeader::empty_last(number).words());
        self.current = 0;
        self.open_block = false;
        self.dictionary_block = false;
        self.block_events = 0;
        self.next_number = number;
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn next_number(&self) -> u32 {
        self.next_number
    }

    pub fn has_open_block(&self) -> bool {
        self.open_block
    }

    pub fn block_events(&self) -> u32 {
        self.block_events
    }

    /// Header of the open block, or the trailing header if none is open.
    pub fn current_header(&self) -> BlockHeader {
        let start = if self.open_block {
            self.current
        } else {
            self.words.len() - HEADER_WORDS
        };
        let mut raw = [0u32; HEADER_WORDS];
        raw.copy_from_slice(&self.words[start..start + HEADER_WORDS]);
        // Built by this buffer, so always well formed.
        BlockHeader::from_stream(raw, false).unwrap_or(BlockHeader::empty_last(self.next_number))
    }

    /// Returns true if an event of `event_words` must open a new block.
    pub fn starts_new_block(&self, event_words: usize, target_words: u32, max_events: u32) -> bool {
        if !self.open_block || self.dictionary_block {
            return true;
        }
        let block_words = self.words.len() - HEADER_WORDS - self.current;
        let fits = event_words + block_words <= target_words as usize && self.block_events < max_events;
        !(fits || self.block_events < 1)
    }

    /// Buffer length in words after appending an event.
    pub fn projected_words(&self, event_words: usize, new_block: bool) -> usize {
        let header = if new_block || !self.open_block {
            HEADER_WORDS
        } else {
            0
        };
        self.words.len() + event_words + header
    }

    /// Appends an event and returns the word index where it starts.
    pub fn append(&mut self, event: &[u32], new_block: bool) -> usize {
        self.push(event, new_block, false)
    }

    /// Appends a dictionary event in a block of its own.
    pub fn append_dictionary(&mut self, event: &[u32]) -> usize {
        self.push(event, true, true)
    }

    /// Word index of the open block's header.
    pub fn current_start(&self) -> usize {
        self.current
    }

    fn push(&mut self, event: &[u32], new_block: bool, dictionary: bool) -> usize {
        self.words.truncate(self.words.len() - HEADER_WORDS);
        if new_block || !self.open_block {
            self.current = self.words.len();
            let mut header = BlockHeader::new(self.next_number).words();
            if dictionary {
                header[slot::VERSION] |= DICTIONARY_BIT;
            }
            self.words.extend_from_slice(&header);
            self.next_number = self.next_number.wrapping_add(1);
            self.open_block = true;
            self.dictionary_block = dictionary;
            self.block_events = 0;
        }

        let start = self.words.len();
        self.words.extend_from_slice(event);
        self.words[self.current + slot::SIZE] = (self.words.len() - self.current) as u32;
        if !dictionary {
            self.block_events += 1;
            self.words[self.current + slot::COUNT] = self.block_events;
        }
        self.words
            .extend_from_slice(&BlockHeader::empty_last(self.next_number).words());
        start
    }

    /// Host-order bytes of `words[from..to]`.
    pub fn bytes(&self, from: usize, to: usize) -> Vec<u8> {
        self.words[from..to]
            .iter()
            .flat_map(|w| w.to_ne_bytes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_trailer(buffer: &BlockBuffer, number: u32) {
        let tail = &buffer.words()[buffer.len() - HEADER_WORDS..];
        assert_eq!(tail, BlockHeader::empty_last(number).words());
    }

    #[test]
    fn fresh_buffer_is_a_trailer() {
        let buffer = BlockBuffer::new(1);
        assert_eq!(buffer.len(), 8);
        assert_trailer(&buffer, 1);
        assert!(buffer.current_header().is_last());
    }

    #[test]
    fn events_fill_one_block() {
        let mut buffer = BlockBuffer::new(1);
        assert_eq!(buffer.append(&[1, 0x0001_0100, 5], false), 8);
        assert_trailer(&buffer, 2);
        assert_eq!(buffer.append(&[1, 0x0002_0100, 6], false), 11);
        assert_trailer(&buffer, 2);

        let header = buffer.current_header();
        assert_eq!(header.size(), 14);
        assert_eq!(header.count(), 2);
        assert_eq!(header.number(), 1);
        assert!(!header.is_last());
        assert_eq!(buffer.len(), 22);
    }

    #[test]
    fn new_block_rules() {
        let mut buffer = BlockBuffer::new(1);
        assert!(buffer.starts_new_block(3, 256, 10));
        buffer.append(&[2, 0x0001_0100, 0, 0], false);
        assert!(!buffer.starts_new_block(3, 256, 10));
        assert!(buffer.starts_new_block(300, 256, 10));
        assert!(buffer.starts_new_block(3, 256, 1));

        buffer.append(&[1, 0x0001_0100, 9], true);
        assert_eq!(buffer.current_header().number(), 2);
        assert_eq!(buffer.current_header().count(), 1);
        assert_trailer(&buffer, 3);
    }

    #[test]
    fn reset_keeps_numbering() {
        let mut buffer = BlockBuffer::new(1);
        buffer.append(&[1, 0x0001_0100, 9], false);
        buffer.reset(buffer.next_number());
        assert_eq!(buffer.len(), 8);
        assert_trailer(&buffer, 2);
        assert!(!buffer.has_open_block());
        assert_eq!(buffer.block_events(), 0);
    }

    #[test]
    fn dictionary_gets_its_own_block() {
        let mut buffer = BlockBuffer::new(1);
        buffer.append_dictionary(&[1, 0x0000_0300, 0x0404_0000]);
        let header = buffer.current_header();
        assert!(header.has_dictionary());
        assert_eq!(header.count(), 0);
        assert!(buffer.starts_new_block(3, 1000, 10));

        buffer.append(&[1, 0x0001_0100, 9], false);
        let header = buffer.current_header();
        assert!(!header.has_dictionary());
        assert_eq!(header.number(), 2);
        assert_eq!(header.count(), 1);
    }

    #[test]
    fn projected_length_counts_new_header() {
        let mut buffer = BlockBuffer::new(1);
        assert_eq!(buffer.projected_words(3, false), 19);
        buffer.append(&[1, 0x0001_0100, 9], false);
        assert_eq!(buffer.projected_words(3, false), 22);
        assert_eq!(buffer.projected_words(3, true), 30);
    }
}
