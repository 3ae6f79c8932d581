//! Typed results handed to downstream rules.
//!
//! Downstream rules receive these by reference; nothing here is mutated after
//! a pipeline call returns, except by explicitly merging contexts.

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

/// Files built when the rule itself is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultOutputs {
  pub files: Vec<Artifact>,
}

/// What the header pipeline produced for one input header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedHeader {
  pub header: Artifact,
  /// Rewritten, directly compilable companion source.
  pub source: Artifact,
  /// Opaque JSON metadata document, passed through untouched.
  pub metadata: Artifact,
}

/// Generated sources, metadata documents, and the headers they came from.
///
/// The headers stay visible so consumers of the metadata can resolve the
/// relative references it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifactBundle {
  pub entries: Vec<GeneratedHeader>,
}

impl GeneratedArtifactBundle {
  pub fn sources(&self) -> impl Iterator<Item = &Artifact> {
    self.entries.iter().map(|e| &e.source)
  }

  pub fn metadata(&self) -> impl Iterator<Item = &Artifact> {
    self.entries.iter().map(|e| &e.metadata)
  }

  pub fn headers(&self) -> impl Iterator<Item = &Artifact> {
    self.entries.iter().map(|e| &e.header)
  }

  /// The entry produced from `header`, if any.
  pub fn for_header(&self, header: &Artifact) -> Option<&GeneratedHeader> {
    self.entries.iter().find(|e| e.header == *header)
  }
}

/// Result of the header pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOutputs {
  pub default_outputs: DefaultOutputs,
  pub bundle: GeneratedArtifactBundle,
}

/// Include directories and headers that augment another rule's compilation.
///
/// Files here are available for inclusion only; they are never compiled or
/// linked on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationContext {
  /// Exec paths of include directories, without duplicates, in first-seen order.
  pub include_dirs: Vec<String>,
  pub headers: Vec<Artifact>,
}

impl CompilationContext {
  pub fn add_include_dir(&mut self, dir: &str) {
    let dir = if dir.is_empty() { "." } else { dir };
    if !self.include_dirs.iter().any(|d| d == dir) {
      self.include_dirs.push(dir.to_string());
    }
  }

  pub fn add_header(&mut self, header: Artifact) {
    if !self.headers.contains(&header) {
      self.headers.push(header);
    }
  }

  /// Fold another context into this one.
  pub fn merge(&mut self, other: &CompilationContext) {
    for dir in &other.include_dirs {
      self.add_include_dir(dir);
    }
    for header in &other.headers {
      self.add_header(header.clone());
    }
  }
}
