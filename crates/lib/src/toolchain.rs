//! Generator location and ambient include context.
//!
//! The toolchain is resolved once per build graph evaluation and handed to
//! every pipeline call explicitly. Nothing here is read from global state
//! after resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{ENV_GENERATOR, ENV_INCLUDE_DIRS};

#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("generator location not set (expected ${0})")]
  GeneratorNotSet(&'static str),

  #[error("failed to read toolchain file {path}: {message}")]
  Read { path: String, message: String },

  #[error("failed to parse toolchain file {path}: {message}")]
  Parse { path: String, message: String },

  #[error("toolchain file {0} has an empty generator path")]
  EmptyGenerator(String),
}

/// Flag spellings understood by the generator.
///
/// Defaults match the meta-object compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorFlags {
  /// Request the structured metadata document (written to `<output>.json`).
  pub metadata: String,
  /// Prefix joined directly to each include directory.
  pub include_prefix: String,
  /// Output path flag; the path follows as a separate argument.
  pub output: String,
  /// Generate a fragment meant to be included back into its own source.
  pub self_include: String,
  /// Verbose include-resolution diagnostics.
  pub debug_includes: String,
}

impl Default for GeneratorFlags {
  fn default() -> Self {
    Self {
      metadata: "--output-json".to_string(),
      include_prefix: "-I".to_string(),
      output: "-o".to_string(),
      self_include: "-i".to_string(),
      debug_includes: "--debug-includes".to_string(),
    }
  }
}

/// The opaque compilation context the generator needs to parse its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientContext {
  /// System include directories, in search order.
  pub include_dirs: Vec<String>,
}

/// A resolved generator toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Toolchain {
  pub generator: PathBuf,
  #[serde(flatten)]
  pub context: AmbientContext,
  #[serde(default)]
  pub flags: GeneratorFlags,
}

impl Toolchain {
  pub fn new(generator: impl Into<PathBuf>) -> Self {
    Self {
      generator: generator.into(),
      context: AmbientContext::default(),
      flags: GeneratorFlags::default(),
    }
  }

  pub fn with_include_dirs<I, S>(mut self, dirs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.context.include_dirs = dirs.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_flags(mut self, flags: GeneratorFlags) -> Self {
    self.flags = flags;
    self
  }

  /// `-I<dir>` arguments for the ambient include directories, in order.
  pub fn include_args(&self) -> Vec<String> {
    self
      .context
      .include_dirs
      .iter()
      .map(|dir| format!("{}{}", self.flags.include_prefix, dir))
      .collect()
  }
}

/// Anything that can produce the toolchain for one build graph evaluation.
pub trait ToolchainResolver {
  fn resolve(&self) -> Result<Toolchain, ToolchainError>;
}

/// Resolves the toolchain from a JSON file.
///
/// ```json
/// { "generator": "/usr/lib/qt6/libexec/moc", "include_dirs": ["/usr/include/qt6"] }
/// ```
#[derive(Debug, Clone)]
pub struct FileToolchain {
  path: PathBuf,
}

impl FileToolchain {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl ToolchainResolver for FileToolchain {
  fn resolve(&self) -> Result<Toolchain, ToolchainError> {
    let content = std::fs::read_to_string(&self.path).map_err(|e| ToolchainError::Read {
      path: self.path.display().to_string(),
      message: e.to_string(),
    })?;
    let toolchain: Toolchain = serde_json::from_str(&content).map_err(|e| ToolchainError::Parse {
      path: self.path.display().to_string(),
      message: e.to_string(),
    })?;
    if toolchain.generator.as_os_str().is_empty() {
      return Err(ToolchainError::EmptyGenerator(self.path.display().to_string()));
    }
    debug!(path = %self.path.display(), generator = %toolchain.generator.display(), "resolved toolchain from file");
    Ok(toolchain)
  }
}

/// Resolves the toolchain from `MOCGRAPH_GENERATOR` and `MOCGRAPH_INCLUDE_DIRS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvToolchain;

impl ToolchainResolver for EnvToolchain {
  fn resolve(&self) -> Result<Toolchain, ToolchainError> {
    let generator = std::env::var_os(ENV_GENERATOR)
      .filter(|v| !v.is_empty())
      .ok_or(ToolchainError::GeneratorNotSet(ENV_GENERATOR))?;

    let include_dirs: Vec<String> = std::env::var_os(ENV_INCLUDE_DIRS)
      .map(|value| {
        std::env::split_paths(&value)
          .filter(|p| !p.as_os_str().is_empty())
          .map(|p| p.to_string_lossy().to_string())
          .collect()
      })
      .unwrap_or_default();

    debug!(generator = ?generator, include_dirs = include_dirs.len(), "resolved toolchain from environment");
    Ok(Toolchain::new(PathBuf::from(generator)).with_include_dirs(include_dirs))
  }
}
