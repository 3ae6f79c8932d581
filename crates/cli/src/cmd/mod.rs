//! Subcommand implementations and the options they share.

mod headers;
mod rewrite;
mod sources;

pub use headers::cmd_headers;
pub use rewrite::cmd_rewrite;
pub use sources::cmd_sources;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::info;

use mocgraph_lib::action::{ActionCtx, Plan};
use mocgraph_lib::artifact::SourceTree;
use mocgraph_lib::consts::DEFAULT_OUT_DIR;
use mocgraph_lib::execute::{ExecuteConfig, PlanResult, execute_plan};
use mocgraph_lib::toolchain::{EnvToolchain, FileToolchain, Toolchain, ToolchainResolver};

use crate::output::{OutputFormat, format_elapsed, print_error, print_stat, print_warning, truncate_hash};

/// Options shared by the commands that declare and run generator actions.
#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Build root that input paths are relative to
  #[arg(long, default_value = ".")]
  pub root: PathBuf,

  /// Directory under the build root that receives generated files
  #[arg(long, default_value = DEFAULT_OUT_DIR)]
  pub out_dir: String,

  /// Toolchain JSON file (default: MOCGRAPH_GENERATOR / MOCGRAPH_INCLUDE_DIRS)
  #[arg(long)]
  pub toolchain: Option<PathBuf>,

  /// Print the declared plan as JSON without running it
  #[arg(long)]
  pub dry_run: bool,

  /// Maximum number of actions to run at once
  #[arg(short, long)]
  pub jobs: Option<usize>,

  /// Run the generator directly in the build root
  #[arg(long)]
  pub no_sandbox: bool,

  /// Keep running independent actions after a failure
  #[arg(long)]
  pub keep_going: bool,

  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub output: OutputFormat,
}

/// A finished plan run.
pub struct Execution {
  pub result: PlanResult,
  pub elapsed: Duration,
}

impl BuildArgs {
  pub fn source_tree(&self) -> Result<SourceTree> {
    SourceTree::new(&self.root).with_context(|| format!("Invalid build root: {}", self.root.display()))
  }

  pub fn resolve_toolchain(&self) -> Result<Toolchain> {
    match &self.toolchain {
      Some(path) => FileToolchain::new(path).resolve(),
      None => EnvToolchain.resolve(),
    }
    .context("Failed to resolve toolchain")
  }

  pub fn action_ctx(&self) -> Result<ActionCtx> {
    ActionCtx::new(&self.out_dir).with_context(|| format!("Invalid output directory: {}", self.out_dir))
  }

  pub fn execute_config(&self) -> ExecuteConfig {
    let defaults = ExecuteConfig::default();
    ExecuteConfig {
      parallelism: self.jobs.unwrap_or(defaults.parallelism).max(1),
      sandbox: defaults.sandbox && !self.no_sandbox,
      keep_going: self.keep_going,
    }
  }

  /// Run `plan` against the build root on a fresh runtime.
  pub fn execute(&self, plan: &Plan, root: &Path) -> Result<Execution> {
    let config = self.execute_config();
    info!(
      actions = plan.actions.len(),
      parallelism = config.parallelism,
      sandbox = config.sandbox,
      root = %root.display(),
      "executing plan"
    );
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    let start = Instant::now();
    let result = rt
      .block_on(execute_plan(plan, root, &config))
      .context("Plan execution failed")?;

    Ok(Execution {
      result,
      elapsed: start.elapsed(),
    })
  }
}

impl Execution {
  pub fn to_json(&self) -> serde_json::Value {
    let failed: Vec<_> = self
      .result
      .failed
      .iter()
      .map(|f| serde_json::json!({ "action": f.description, "hash": f.key.0, "error": f.error.to_string() }))
      .collect();
    serde_json::json!({
      "completed": self.result.completed.len(),
      "cached": self.result.cached_count(),
      "failed": failed,
      "skipped": self.result.skipped.len(),
      "elapsed_ms": self.elapsed.as_millis() as u64,
    })
  }

  pub fn print_summary(&self) {
    print_stat("Actions run", &self.result.executed_count().to_string());
    print_stat("Cached", &self.result.cached_count().to_string());
    if !self.result.skipped.is_empty() {
      print_stat("Skipped", &self.result.skipped.len().to_string());
    }
    print_stat("Elapsed", &format_elapsed(self.elapsed));
  }

  /// Report every failure and turn an unsuccessful run into an error.
  pub fn ensure_success(&self, format: OutputFormat) -> Result<()> {
    if self.result.is_success() {
      return Ok(());
    }
    if !format.is_json() {
      for failed in &self.result.failed {
        print_error(&format!(
          "{} [{}]: {}",
          failed.description,
          truncate_hash(&failed.key.0),
          failed.error
        ));
      }
      if !self.result.skipped.is_empty() {
        print_warning(&format!(
          "{} action(s) skipped after a failure",
          self.result.skipped.len()
        ));
      }
    }
    bail!(
      "{} of {} action(s) failed",
      self.result.failed.len(),
      self.result.total()
    )
  }
}
