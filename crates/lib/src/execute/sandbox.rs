//! Per-action exec roots.
//!
//! A sandbox is a fresh directory that mirrors the build root but contains
//! only what the action declared: its inputs, relative ambient include
//! directories, and empty parent directories for its outputs. Declared outputs
//! are moved back to the build root afterwards; anything else the tool wrote
//! is dropped with the sandbox.

use std::path::{Component, Path};

use tempfile::TempDir;
use tracing::debug;

use crate::action::GeneratorInvocation;

use super::types::ExecuteError;

pub struct Sandbox {
  dir: TempDir,
}

impl Sandbox {
  /// Create a sandbox under `sandbox_root` for one invocation.
  pub fn create(sandbox_root: &Path, build_root: &Path, invocation: &GeneratorInvocation) -> Result<Self, ExecuteError> {
    std::fs::create_dir_all(sandbox_root)?;
    let dir = tempfile::Builder::new().prefix("exec-").tempdir_in(sandbox_root)?;

    for input in invocation.inputs() {
      let target = dir.path().join(&input.exec_path);
      if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
      }
      link_file(&build_root.join(&input.exec_path), &target)?;
    }

    for output in &invocation.outputs {
      if let Some(parent) = dir.path().join(&output.exec_path).parent() {
        std::fs::create_dir_all(parent)?;
      }
    }

    // Linked last so they never shadow a directory that already holds inputs or outputs.
    for ambient in &invocation.ambient_dirs {
      let relative = Path::new(ambient);
      if relative.is_absolute() || !stays_inside(relative) {
        continue;
      }
      let source = build_root.join(relative);
      let target = dir.path().join(relative);
      if !source.is_dir() || target.exists() {
        continue;
      }
      if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
      }
      link_dir(&source, &target)?;
    }

    debug!(sandbox = %dir.path().display(), inputs = invocation.inputs().len(), "created sandbox");
    Ok(Self { dir })
  }

  pub fn exec_root(&self) -> &Path {
    self.dir.path()
  }

  /// Move every declared output into the build root.
  pub fn collect_outputs(&self, build_root: &Path, invocation: &GeneratorInvocation, action: &str) -> Result<(), ExecuteError> {
    for output in &invocation.outputs {
      let produced = self.dir.path().join(&output.exec_path);
      if !produced.is_file() {
        return Err(ExecuteError::MissingOutput {
          action: action.to_string(),
          path: output.exec_path.clone(),
        });
      }

      let dest = build_root.join(&output.exec_path);
      if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
      }
      if std::fs::rename(&produced, &dest).is_err() {
        std::fs::copy(&produced, &dest)?;
      }
    }
    Ok(())
  }
}

/// True when the path has no root, prefix, `..` or `.`-only form.
pub(super) fn stays_inside(path: &Path) -> bool {
  let mut depth = 0usize;
  for component in path.components() {
    match component {
      Component::Normal(_) => depth += 1,
      Component::CurDir => {}
      _ => return false,
    }
  }
  depth > 0
}

#[cfg(unix)]
fn link_file(source: &Path, target: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn link_file(source: &Path, target: &Path) -> std::io::Result<()> {
  std::fs::copy(source, target).map(|_| ())
}

#[cfg(unix)]
fn link_dir(source: &Path, target: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn link_dir(source: &Path, target: &Path) -> std::io::Result<()> {
  std::os::windows::fs::symlink_dir(source, target)
}
