//! mocgraph-lib: build graph integration for a moc-style code generator
//!
//! This crate declares and runs generator actions for C++ meta-object code:
//! - `pipeline`: turns header and source lists into declared actions
//! - `action`: the action records and the `Plan` they form
//! - `rewrite`: include-directive substitution over generated sources
//! - `provider`: what a pipeline hands to downstream compile steps
//! - `toolchain`: where the generator and its ambient include dirs come from
//! - `execute`: runs a plan against a build root

pub mod action;
pub mod artifact;
pub mod consts;
pub mod execute;
pub mod pipeline;
pub mod provider;
pub mod rewrite;
pub mod toolchain;
pub mod util;
