//! Bounds-checked position within the current block.

use crate::error::{EvioError, EvioResult};
use std::ops::Range;

/// The current block's words and the unread part of its data span.
///
/// Words are kept exactly as they appear in the stream; the cursor does not
/// swap anything.
#[derive(Debug, Default)]
pub struct BlockCursor {
    words: Vec<u32>,
    pos: usize,
    end: usize,
}

impl BlockCursor {
    /// Creates an empty cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the block, positioning at the start of `span`.
    ///
    /// The span is clamped to the block.
    pub fn load(&mut self, words: Vec<u32>, span: Range<usize>) {
        let end = span.end.min(words.len());
        self.pos = span.start.min(end);
        self.end = end;
        self.words = words;
    }

    /// Unread data words.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Returns true if no data words remain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.end
    }

    /// The next word without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u32> {
        (self.pos < self.end).then(|| self.words[self.pos])
    }

    /// Consumes up to `n` words and returns them.
    pub fn take_up_to(&mut self, n: usize) -> &[u32] {
        let n = n.min(self.remaining());
        let start = self.pos;
        self.pos += n;
        &self.words[start..self.pos]
    }

    /// Consumes exactly `n` words and returns them mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::UnexpectedEnd`] if fewer than `n` words remain.
    pub fn take_mut(&mut self, n: usize) -> EvioResult<&mut [u32]> {
        if n > self.remaining() {
            return Err(EvioError::unexpected_end(format!(
                "event of {n} words overruns its block ({} words left)",
                self.remaining()
            )));
        }
        let start = self.pos;
        self.pos += n;
        Ok(&mut self.words[start..self.pos])
    }

    /// Skips `n` words.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::UnexpectedEnd`] if fewer than `n` words remain.
    pub fn advance(&mut self, n: usize) -> EvioResult<()> {
        self.take_mut(n).map(|_| ())
    }

    /// Drops the unread data, leaving the cursor exhausted.
    pub fn exhaust(&mut self) {
        self.pos = self.end;
    }
}
