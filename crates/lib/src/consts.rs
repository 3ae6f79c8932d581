//! Fixed names shared by planning and execution.

/// Prefix for generated companion sources so they never collide with hand-written files.
pub const GENERATED_PREFIX: &str = "moc_";

/// Extension of generated companion sources (Pipeline A).
pub const GENERATED_SOURCE_EXT: &str = "cpp";

/// Extension of self-include fragments (Pipeline B).
pub const FRAGMENT_EXT: &str = "moc";

/// The generator derives the metadata document name from its output path by appending this.
pub const METADATA_SUFFIX: &str = ".json";

pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx"];

pub const SOURCE_EXTENSIONS: &[&str] = &["cc", "cpp", "cxx", "c++"];

/// Default output directory, relative to the build root.
pub const DEFAULT_OUT_DIR: &str = "mocgraph-out";

/// Executor bookkeeping lives under `<out>/.mocgraph`.
pub const STATE_DIR: &str = ".mocgraph";
pub const STAMPS_DIR: &str = "stamps";
pub const SANDBOX_DIR: &str = "sandbox";

/// Length of the truncated hash used for action keys.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Environment variables read by [`crate::toolchain::EnvToolchain`].
pub const ENV_GENERATOR: &str = "MOCGRAPH_GENERATOR";
pub const ENV_INCLUDE_DIRS: &str = "MOCGRAPH_INCLUDE_DIRS";
