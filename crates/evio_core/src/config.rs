//! Session configuration.

/// Words in a standard block header.
pub const HEADER_WORDS: usize = 8;

/// Default target block size in words.
pub const DEFAULT_BLOCK_WORDS: u32 = 64_000;

/// Smallest target block size in words.
pub const MIN_BLOCK_WORDS: u32 = 256;

/// Largest target block size in words.
pub const MAX_BLOCK_WORDS: u32 = 25_600_000;

/// Default maximum number of events per block.
pub const DEFAULT_BLOCK_EVENTS: u32 = 10_000;

/// Upper clamp for the maximum number of events per block.
pub const MAX_BLOCK_EVENTS: u32 = 100_000;

/// Default split threshold in bytes.
pub const DEFAULT_SPLIT_BYTES: u64 = 2_000_000_000;

/// Smallest valid stream in bytes: two headers and a minimal event.
pub const MIN_SPLIT_BYTES: u64 = 4 * 18;

/// Smallest memory buffer accepted for reading or appending, in bytes.
pub const MIN_BUFFER_BYTES: usize = 4 * 11;

/// What to do when a block number is out of sequence while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePolicy {
    /// Count the mismatch, log a warning and keep reading.
    #[default]
    Record,
    /// Fail the read with a bad-block error.
    Abort,
}

/// Options applied when a session is opened.
///
/// Values are validated at open time with the same rules as the
/// corresponding runtime controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    /// Target block size in words.
    pub block_words: u32,

    /// Write buffer size in words (file and socket writers).
    pub buffer_words: u32,

    /// Maximum events per block.
    pub max_block_events: u32,

    /// Split threshold in bytes (split-write mode only).
    pub split_bytes: u64,

    /// Run number used in file names.
    pub run_number: u32,

    /// Run type substituted for `%s` in file names.
    pub run_type: Option<String>,

    /// Block sequence policy for readers.
    pub sequence_policy: SequencePolicy,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            block_words: DEFAULT_BLOCK_WORDS,
            buffer_words: DEFAULT_BLOCK_WORDS + HEADER_WORDS as u32,
            max_block_events: DEFAULT_BLOCK_EVENTS,
            split_bytes: DEFAULT_SPLIT_BYTES,
            run_number: 1,
            run_type: None,
            sequence_policy: SequencePolicy::Record,
        }
    }
}

impl OpenOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target block size in words.
    ///
    /// The buffer grows to hold one block if it is smaller.
    #[must_use]
    pub const fn block_words(mut self, words: u32) -> Self {
        self.block_words = words;
        let needed = words.saturating_add(HEADER_WORDS as u32);
        if self.buffer_words < needed {
            self.buffer_words = needed;
        }
        self
    }

    /// Sets the write buffer size in words.
    #[must_use]
    pub const fn buffer_words(mut self, words: u32) -> Self {
        self.buffer_words = words;
        self
    }

    /// Sets the maximum number of events per block.
    #[must_use]
    pub const fn max_block_events(mut self, events: u32) -> Self {
        self.max_block_events = events;
        self
    }

    /// Sets the split threshold in bytes.
    #[must_use]
    pub const fn split_bytes(mut self, bytes: u64) -> Self {
        self.split_bytes = bytes;
        self
    }

    /// Sets the run number.
    #[must_use]
    pub const fn run_number(mut self, run: u32) -> Self {
        self.run_number = run;
        self
    }

    /// Sets the run type.
    #[must_use]
    pub fn run_type(mut self, run_type: impl Into<String>) -> Self {
        self.run_type = Some(run_type.into());
        self
    }

    /// Sets the block sequence policy.
    #[must_use]
    pub const fn sequence_policy(mut self, policy: SequencePolicy) -> Self {
        self.sequence_policy = policy;
        self
    }
}
