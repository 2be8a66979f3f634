//! CLI command implementations.

pub mod copy;
pub mod dump;
pub mod inspect;
pub mod verify;
