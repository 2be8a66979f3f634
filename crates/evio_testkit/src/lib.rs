//! # EVIO Testkit
//!
//! Test utilities for EVIO.
//!
//! This crate provides:
//! - Test fixtures and whole-stream helpers
//! - Property-based test generators using proptest
//! - Golden stream layouts for format verification
//! - Fuzz testing harnesses
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use evio_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_buffer() {
//!     let events: Vec<_> = (0..10).map(sample_event).collect();
//!     let buffer = write_buffer(Some(SAMPLE_DICTIONARY), &events);
//!     let (_, read) = read_stream(buffer, "rb").unwrap();
//!     assert_eq!(read, events);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod golden;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::golden::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;
