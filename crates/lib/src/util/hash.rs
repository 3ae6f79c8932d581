//! Hashing utilities for action identity and cache validation.
//!
//! This module provides:
//! - `ObjectHash`: a truncated 20-character hash identifying an action description
//! - `ContentHash`: a full 64-character hash of file contents or cache keys
//! - `hash_file()`: single file hashing
//! - `hash_directory()`: deterministic hashing of a directory tree
//! - `hash_bytes()`: arbitrary byte hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A content-addressed hash identifying a declared action.
///
/// The hash is a 20-character truncated SHA-256 of the JSON-serialized struct.
/// Two actions with the same inputs, outputs and arguments share a hash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let full = format!("{:x}", hasher.finalize());
    Ok(ObjectHash(full[..OBJ_HASH_PREFIX_LEN].to_string()))
  }
}

/// A full 64-character SHA256 hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to read file {path}: {message}")]
pub struct FileHashError {
  pub path: String,
  pub message: String,
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, FileHashError> {
  let read_err = |e: std::io::Error| FileHashError {
    path: path.display().to_string(),
    message: e.to_string(),
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

#[derive(Debug, thiserror::Error)]
pub enum DirHashError {
  #[error("failed to walk directory: {message}")]
  WalkDir { message: String },

  #[error(transparent)]
  ReadFile(#[from] FileHashError),
}

/// Hash the files below `path`.
///
/// Symlinks are followed, so the hash covers what a reader of the tree sees.
/// Entries named in `exclude` are skipped along with everything under them.
/// Only relative paths and file contents are hashed, never timestamps.
pub fn hash_directory(path: &Path, exclude: &[&str]) -> Result<ContentHash, DirHashError> {
  let walker = WalkDir::new(path)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| e.file_name().to_str().is_none_or(|name| !exclude.contains(&name)));

  let mut hasher = Sha256::new();
  for entry in walker {
    let entry = entry.map_err(|e| DirHashError::WalkDir { message: e.to_string() })?;
    let rel_path = entry.path().strip_prefix(path).unwrap_or(entry.path()).to_string_lossy();
    if rel_path.is_empty() {
      continue;
    }

    let line = if entry.file_type().is_file() {
      format!("F:{}:{}", rel_path, hash_file(entry.path())?.0)
    } else if entry.file_type().is_dir() {
      format!("D:{}", rel_path)
    } else {
      continue;
    };
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}

/// Hash an ordered list of labelled parts.
///
/// Each part is written as `label:value\n`, so reordering parts changes the hash.
pub fn hash_parts<'a>(parts: impl IntoIterator<Item = (&'a str, &'a str)>) -> ContentHash {
  let mut hasher = Sha256::new();
  for (label, value) in parts {
    hasher.update(label.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    hasher.update(b"\n");
  }
  ContentHash(format!("{:x}", hasher.finalize()))
}
