//! Domain types and pure functions.
//!
//! Modules here are free of I/O, async, and subprocess access. All functions
//! take data in and return data out, so every rule is unit-testable.

pub mod error;
pub mod manifest;
pub mod session;
pub mod target;
