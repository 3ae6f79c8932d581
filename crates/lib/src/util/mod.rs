//! Shared utilities.
//!
//! Hashing of action descriptions and file contents, plus test helpers.

pub mod hash;

#[cfg(test)]
pub mod testutil;
