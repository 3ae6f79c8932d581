//! Types for plan execution.
//!
//! This module defines the error types, result types, and configuration
//! for running the actions of a [`Plan`](crate::action::Plan).

use std::collections::HashMap;

use thiserror::Error;

use crate::util::hash::{DirHashError, FileHashError, ObjectHash};

/// Errors that can occur while running an action.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A declared input does not exist when the action is about to run.
  #[error("{action}: missing input {path}")]
  MissingInput { action: String, path: String },

  /// The generator exited unsuccessfully.
  ///
  /// Carries everything needed to attribute the failure to one input: the
  /// exact command line and the tool's output. Output is kept as text; bytes
  /// that are not valid UTF-8 are replaced with U+FFFD and everything else is
  /// unmodified.
  #[error(
    "generator failed for {input} (exit code {code:?})\n  command: {tool} {}\n{stderr}{stdout}",
    .args.join(" ")
  )]
  GeneratorFailed {
    input: String,
    tool: String,
    args: Vec<String>,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  /// The generator could not be started.
  #[error("failed to start generator {tool}: {message}")]
  Spawn { tool: String, message: String },

  /// The action finished but a declared output is absent.
  #[error("{action}: declared output {path} was not produced")]
  MissingOutput { action: String, path: String },

  #[error("failed to hash input: {0}")]
  HashInput(#[from] FileHashError),

  #[error("failed to hash include directory: {0}")]
  HashIncludeDir(#[from] DirHashError),

  #[error("failed to hash action description: {0}")]
  HashAction(#[from] serde_json::Error),

  /// Two actions consume each other's outputs.
  #[error("dependency cycle detected")]
  CycleDetected,

  /// An action task did not run to completion.
  #[error("action task aborted: {0}")]
  Task(String),

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Result of running (or reusing) a single action.
#[derive(Debug, Clone)]
pub struct ActionResult {
  pub key: ObjectHash,
  /// Human-readable label, e.g. `MocHeader widget.h`.
  pub description: String,
  /// True when the outputs were reused from a previous run.
  pub cached: bool,
  /// Exec paths of the outputs.
  pub outputs: Vec<String>,
}

/// An action that failed.
#[derive(Debug)]
pub struct FailedAction {
  pub key: ObjectHash,
  pub description: String,
  pub error: ExecuteError,
}

/// Result of executing a whole plan.
#[derive(Debug, Default)]
pub struct PlanResult {
  /// Successfully completed actions.
  pub completed: HashMap<ObjectHash, ActionResult>,

  /// Actions that failed while running.
  pub failed: Vec<FailedAction>,

  /// Actions that never ran, mapped to the failed action that caused the skip.
  pub skipped: HashMap<ObjectHash, ObjectHash>,
}

impl PlanResult {
  /// Returns true if every action completed.
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  pub fn total(&self) -> usize {
    self.completed.len() + self.failed.len() + self.skipped.len()
  }

  pub fn cached_count(&self) -> usize {
    self.completed.values().filter(|r| r.cached).count()
  }

  pub fn executed_count(&self) -> usize {
    self.completed.len() - self.cached_count()
  }
}

/// Configuration for plan execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of actions to run in parallel.
  pub parallelism: usize,

  /// Run generator actions in an exec root that only contains their declared inputs.
  pub sandbox: bool,

  /// Keep running actions that do not depend on a failure.
  pub keep_going: bool,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      sandbox: cfg!(unix),
      keep_going: false,
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
