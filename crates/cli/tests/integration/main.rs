//! End-to-end tests that run the CLI against a fake generator.

#![cfg(unix)]

mod common;
mod headers_tests;
mod sources_tests;
