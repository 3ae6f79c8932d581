//! Files as the build graph sees them.
//!
//! An [`Artifact`] is either a source file, addressed relative to the build
//! root, or a generated file, addressed relative to the output directory.
//! Every artifact also carries its exec path: the path relative to the build
//! root that actions are handed on their command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{HEADER_EXTENSIONS, SOURCE_EXTENSIONS};

/// Errors raised while validating rule inputs.
///
/// These are input-contract violations: they are reported before any action
/// is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
  #[error("no {kind} files given")]
  Empty { kind: FileKind },

  #[error("{path}: unsupported extension for {kind} input (expected one of: {allowed})")]
  UnsupportedExtension {
    path: String,
    kind: FileKind,
    allowed: String,
  },

  #[error("{0}: listed more than once")]
  Duplicate(String),

  #[error("invalid path '{path}': {reason}")]
  InvalidPath { path: String, reason: &'static str },

  #[error("invalid rule name '{0}': must be non-empty and contain no '/'")]
  InvalidRuleName(String),

  #[error("{0}: no such file under the build root")]
  NotFound(String),

  #[error("invalid build root {path}: {message}")]
  Root { path: String, message: String },
}

/// The two input classes accepted by the pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
  Header,
  Source,
}

impl FileKind {
  pub fn extensions(self) -> &'static [&'static str] {
    match self {
      FileKind::Header => HEADER_EXTENSIONS,
      FileKind::Source => SOURCE_EXTENSIONS,
    }
  }

  /// Whether the artifact's extension belongs to this class (case-sensitive).
  pub fn accepts(self, artifact: &Artifact) -> bool {
    artifact
      .extension()
      .map(|ext| self.extensions().contains(&ext))
      .unwrap_or(false)
  }
}

impl std::fmt::Display for FileKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FileKind::Header => write!(f, "header"),
      FileKind::Source => write!(f, "source"),
    }
  }
}

/// A file in the build graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Artifact {
  /// Path relative to the artifact's root (build root or output directory).
  pub short_path: String,
  /// Path relative to the build root.
  pub exec_path: String,
  /// True for files produced by an action.
  pub generated: bool,
}

impl Artifact {
  /// A source file at a build-root-relative path.
  pub fn source(path: &str) -> Result<Self, InputError> {
    let short_path = normalize_relative(path)?;
    Ok(Self {
      exec_path: short_path.clone(),
      short_path,
      generated: false,
    })
  }

  /// A generated file at `short_path` under the output directory `out_dir`.
  pub fn generated(out_dir: &str, short_path: &str) -> Self {
    Self {
      exec_path: join(out_dir, short_path),
      short_path: short_path.to_string(),
      generated: true,
    }
  }

  /// The final path component, e.g. `baz.h` for `bar/baz.h`.
  pub fn basename(&self) -> &str {
    self
      .short_path
      .rsplit_once('/')
      .map(|(_, name)| name)
      .unwrap_or(&self.short_path)
  }

  /// The basename without its last extension.
  pub fn stem(&self) -> &str {
    let name = self.basename();
    match name.rsplit_once('.') {
      Some((stem, _)) if !stem.is_empty() => stem,
      _ => name,
    }
  }

  pub fn extension(&self) -> Option<&str> {
    match self.basename().rsplit_once('.') {
      Some((stem, ext)) if !stem.is_empty() => Some(ext),
      _ => None,
    }
  }

  /// Directory part of the short path, empty at the root.
  pub fn dirname(&self) -> &str {
    dirname(&self.short_path)
  }

  /// Directory part of the exec path, empty at the build root.
  pub fn exec_dirname(&self) -> &str {
    dirname(&self.exec_path)
  }
}

impl std::fmt::Display for Artifact {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.exec_path)
  }
}

/// Normalise a build-root-relative path to `/`-separated form.
///
/// `.` segments and repeated separators are dropped. Absolute paths and `..`
/// segments are rejected: inputs must stay inside the build root.
pub fn normalize_relative(path: &str) -> Result<String, InputError> {
  let unified = path.replace('\\', "/");
  let invalid = |reason| InputError::InvalidPath {
    path: path.to_string(),
    reason,
  };

  if unified.starts_with('/') || Path::new(path).is_absolute() {
    return Err(invalid("must be relative to the build root"));
  }

  let mut segments = Vec::new();
  for segment in unified.split('/') {
    match segment {
      "" | "." => continue,
      ".." => return Err(invalid("must not leave the build root")),
      s => segments.push(s),
    }
  }

  if segments.is_empty() {
    return Err(invalid("empty path"));
  }

  Ok(segments.join("/"))
}

/// Join two `/`-separated relative paths, either of which may be empty.
pub fn join(base: &str, rest: &str) -> String {
  match (base.is_empty(), rest.is_empty()) {
    (true, _) => rest.to_string(),
    (_, true) => base.to_string(),
    _ => format!("{}/{}", base.trim_end_matches('/'), rest),
  }
}

fn dirname(path: &str) -> &str {
  path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Check the rule input surface for one pipeline call.
///
/// Rejects empty lists, files outside `kind`'s extension set, and the same
/// file listed twice.
pub fn validate_inputs(kind: FileKind, inputs: &[Artifact]) -> Result<(), InputError> {
  if inputs.is_empty() {
    return Err(InputError::Empty { kind });
  }

  let mut seen = std::collections::HashSet::new();
  for input in inputs {
    if !kind.accepts(input) {
      return Err(InputError::UnsupportedExtension {
        path: input.short_path.clone(),
        kind,
        allowed: kind
          .extensions()
          .iter()
          .map(|e| format!(".{}", e))
          .collect::<Vec<_>>()
          .join(" "),
      });
    }
    if !seen.insert(&input.exec_path) {
      return Err(InputError::Duplicate(input.exec_path.clone()));
    }
  }

  Ok(())
}

/// The source side of the build graph: files under a build root.
#[derive(Debug, Clone)]
pub struct SourceTree {
  root: PathBuf,
}

impl SourceTree {
  /// Open a build root. The path is canonicalised so actions can be run from it.
  pub fn new(root: &Path) -> Result<Self, InputError> {
    let root = dunce::canonicalize(root).map_err(|e| InputError::Root {
      path: root.display().to_string(),
      message: e.to_string(),
    })?;
    if !root.is_dir() {
      return Err(InputError::Root {
        path: root.display().to_string(),
        message: "not a directory".to_string(),
      });
    }
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Resolve a build-root-relative path to a source artifact that exists on disk.
  pub fn resolve(&self, path: &str) -> Result<Artifact, InputError> {
    let artifact = Artifact::source(path)?;
    if !self.root.join(&artifact.exec_path).is_file() {
      return Err(InputError::NotFound(artifact.exec_path));
    }
    Ok(artifact)
  }

  pub fn resolve_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<Artifact>, InputError> {
    paths.iter().map(|p| self.resolve(p.as_ref())).collect()
  }
}
