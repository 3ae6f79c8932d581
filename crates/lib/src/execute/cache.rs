//! Action stamps.
//!
//! After an action succeeds, a stamp recording its cache key and the hash of
//! every output is written to `<out>/.mocgraph/stamps/<action-hash>.json`.
//! On the next run the action is skipped when the cache key still matches
//! and every output still hashes to the recorded value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::Action;
use crate::consts::{STAMPS_DIR, STATE_DIR};
use crate::util::hash::{ContentHash, ObjectHash, hash_directory, hash_file, hash_parts};

use super::sandbox::stays_inside;
use super::types::ExecuteError;

const STAMP_VERSION: u32 = 1;

/// Stamp file content.
#[derive(Debug, Serialize, Deserialize)]
pub struct Stamp {
  /// Stamp format version.
  pub version: u32,
  /// Hash of the action description, the tool and every input.
  pub cache_key: String,
  /// Output exec path to content hash.
  pub outputs: BTreeMap<String, String>,
}

pub fn stamp_path(state_dir: &Path, key: &ObjectHash) -> PathBuf {
  state_dir.join(STAMPS_DIR).join(format!("{}.json", key))
}

/// Compute the cache key of an action.
///
/// Covers the action description, the tool binary, every declared input and
/// the contents of in-tree include directories. Fails with
/// [`ExecuteError::MissingInput`] when a declared input is absent.
pub fn cache_key(
  build_root: &Path,
  action: &Action,
  key: &ObjectHash,
  tool_hash: Option<&ContentHash>,
) -> Result<ContentHash, ExecuteError> {
  let mut parts: Vec<(String, String)> = vec![("action".to_string(), key.0.clone())];
  if let Some(tool_hash) = tool_hash {
    parts.push(("tool".to_string(), tool_hash.0.clone()));
  }

  for input in action.inputs() {
    let path = build_root.join(&input.exec_path);
    if !path.is_file() {
      return Err(ExecuteError::MissingInput {
        action: action.describe(),
        path: input.exec_path.clone(),
      });
    }
    parts.push((input.exec_path.clone(), hash_file(&path)?.0));
  }

  // Relative include dirs are readable by the generator, so their contents count as inputs.
  if let Action::Generate(invocation) = action {
    for dir in &invocation.ambient_dirs {
      let relative = Path::new(dir);
      let path = build_root.join(relative);
      if relative.is_absolute() || !stays_inside(relative) || !path.is_dir() {
        continue;
      }
      parts.push((format!("include:{}", dir), hash_directory(&path, &[STATE_DIR])?.0));
    }
  }

  Ok(hash_parts(parts.iter().map(|(l, v)| (l.as_str(), v.as_str()))))
}

/// Read a stamp. Unreadable or unparseable stamps count as absent.
pub fn read_stamp(path: &Path) -> Option<Stamp> {
  let content = std::fs::read_to_string(path).ok()?;
  match serde_json::from_str::<Stamp>(&content) {
    Ok(stamp) if stamp.version == STAMP_VERSION => Some(stamp),
    Ok(stamp) => {
      debug!(path = ?path, version = stamp.version, "ignoring stamp with unknown version");
      None
    }
    Err(e) => {
      debug!(path = ?path, error = %e, "ignoring unparseable stamp");
      None
    }
  }
}

/// Returns `true` when the action's outputs can be reused.
pub fn is_fresh(build_root: &Path, stamp_path: &Path, cache_key: &ContentHash) -> bool {
  let Some(stamp) = read_stamp(stamp_path) else {
    return false;
  };
  if stamp.cache_key != cache_key.0 {
    debug!(path = ?stamp_path, "cache key changed");
    return false;
  }

  for (output, expected) in &stamp.outputs {
    match hash_file(&build_root.join(output)) {
      Ok(actual) if actual.0 == *expected => {}
      Ok(actual) => {
        warn!(
          path = %output,
          expected = %expected,
          actual = %actual,
          "generated output modified, will regenerate"
        );
        return false;
      }
      Err(e) => {
        warn!(path = %output, error = %e, "generated output unreadable, will regenerate");
        return false;
      }
    }
  }
  true
}

/// Record a successful run of `action`.
pub fn write_stamp(build_root: &Path, stamp_path: &Path, cache_key: &ContentHash, action: &Action) -> Result<(), ExecuteError> {
  let mut outputs = BTreeMap::new();
  for output in action.outputs() {
    let hash = hash_file(&build_root.join(&output.exec_path))?;
    outputs.insert(output.exec_path.clone(), hash.0);
  }

  let stamp = Stamp {
    version: STAMP_VERSION,
    cache_key: cache_key.0.clone(),
    outputs,
  };
  if let Some(parent) = stamp_path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  let content = serde_json::to_string(&stamp)?;
  std::fs::write(stamp_path, format!("{}\n", content))?;
  Ok(())
}

pub fn remove_stamp(stamp_path: &Path) -> Result<(), ExecuteError> {
  match std::fs::remove_file(stamp_path) {
    Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
    _ => Ok(()),
  }
}
