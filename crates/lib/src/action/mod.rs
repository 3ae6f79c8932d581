//! Declared units of work.
//!
//! Planning only describes work: a pipeline call records [`Action`]s in an
//! [`ActionCtx`], and the finished [`Plan`] is handed to an executor. Nothing
//! in this module touches the filesystem or spawns processes.
//!
//! # Action Types
//!
//! - [`Action::Generate`] - run the generator on one input
//! - [`Action::RewriteIncludes`] - rewrite includes in a generated source

mod types;

pub use types::*;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::{Artifact, InputError, normalize_relative};
use crate::consts::DEFAULT_OUT_DIR;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
  /// Two actions would write the same file.
  #[error("output {path} is declared by more than one action")]
  ConflictingOutput { path: String },
}

/// Records the actions declared during one build graph evaluation.
///
/// Each pipeline call registers its actions as one batch: either every action
/// of the batch is recorded or none is.
pub struct ActionCtx {
  out_dir: String,
  actions: Vec<Action>,
  outputs: HashSet<String>,
}

impl Default for ActionCtx {
  fn default() -> Self {
    Self::with_out_dir(DEFAULT_OUT_DIR.to_string())
  }
}

impl ActionCtx {
  /// Create an empty context whose generated files live under `out_dir`.
  ///
  /// `out_dir` is relative to the build root; empty or `.` means the root
  /// itself. Absolute paths and paths leaving the root are rejected.
  pub fn new(out_dir: &str) -> Result<Self, InputError> {
    let out_dir = match out_dir {
      "" | "." | "./" => String::new(),
      dir => normalize_relative(dir)?,
    };
    Ok(Self::with_out_dir(out_dir))
  }

  fn with_out_dir(out_dir: String) -> Self {
    Self {
      out_dir,
      actions: Vec::new(),
      outputs: HashSet::new(),
    }
  }

  pub fn out_dir(&self) -> &str {
    &self.out_dir
  }

  /// Name a generated file. Declaring does not reserve the path; registering the
  /// action that writes it does.
  pub fn declare_file(&self, short_path: &str) -> Artifact {
    Artifact::generated(&self.out_dir, short_path)
  }

  /// Record a batch of actions.
  ///
  /// Fails without recording anything if an output is written twice within the
  /// batch or was already claimed by an earlier batch.
  pub fn register(&mut self, batch: Vec<Action>) -> Result<(), ActionError> {
    let mut claimed = HashSet::new();
    for action in &batch {
      for output in action.outputs() {
        let path = output.exec_path.as_str();
        if self.outputs.contains(path) || !claimed.insert(path) {
          return Err(ActionError::ConflictingOutput { path: path.to_string() });
        }
      }
    }

    let claimed: Vec<String> = claimed.into_iter().map(str::to_string).collect();
    self.outputs.extend(claimed);
    self.actions.extend(batch);
    Ok(())
  }

  pub fn action_count(&self) -> usize {
    self.actions.len()
  }

  /// Consume the context and return the immutable plan.
  pub fn into_plan(self) -> Plan {
    Plan {
      out_dir: self.out_dir,
      actions: self.actions,
    }
  }
}

/// The complete, immutable description of work for an executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
  pub out_dir: String,
  pub actions: Vec<Action>,
}

impl Plan {
  pub fn is_empty(&self) -> bool {
    self.actions.is_empty()
  }
}
