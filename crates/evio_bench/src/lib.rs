//! Shared helpers for the EVIO benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
