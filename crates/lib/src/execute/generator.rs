//! Running the generator process.
//!
//! The generator runs with a cleared environment so that nothing outside the
//! declared inputs and arguments can influence its output:
//! - `PATH` is set to `/path-not-set`
//! - `HOME` is set to `/homeless-shelter`
//! - `LANG`/`LC_ALL` are `C`
//! - `SOURCE_DATE_EPOCH` is fixed

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::action::GeneratorInvocation;

use super::types::ExecuteError;

/// Resolve the tool path against the build root.
///
/// Relative tool paths name files under the build root; they are not looked
/// up on `PATH`.
pub fn resolve_tool(build_root: &Path, tool: &Path) -> PathBuf {
  if tool.is_absolute() {
    tool.to_path_buf()
  } else {
    build_root.join(tool)
  }
}

/// Run one generator invocation with `exec_root` as working directory.
///
/// Returns the captured stdout on success. Any non-zero exit becomes
/// [`ExecuteError::GeneratorFailed`] with stdout and stderr kept verbatim.
pub async fn run_generator(invocation: &GeneratorInvocation, tool: &Path, exec_root: &Path) -> Result<String, ExecuteError> {
  info!(input = %invocation.input, tool = %tool.display(), "running generator");
  debug!(args = ?invocation.args, exec_root = %exec_root.display(), "spawning process");

  let output = Command::new(tool)
    .args(&invocation.args)
    .current_dir(exec_root)
    // Clear all environment variables
    .env_clear()
    // Set isolated environment
    .env("PATH", "/path-not-set")
    .env("HOME", "/homeless-shelter")
    .env("LANG", "C")
    .env("LC_ALL", "C")
    // 315532800 = January 1, 1980 00:00:00 UTC
    .env("SOURCE_DATE_EPOCH", "315532800")
    .output()
    .await
    .map_err(|e| ExecuteError::Spawn {
      tool: tool.display().to_string(),
      message: e.to_string(),
    })?;

  let stdout = String::from_utf8_lossy(&output.stdout).to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).to_string();

  if !output.status.success() {
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "generator stderr");
    }
    return Err(ExecuteError::GeneratorFailed {
      input: invocation.input.exec_path.clone(),
      tool: tool.display().to_string(),
      args: invocation.args.clone(),
      code: output.status.code(),
      stdout,
      stderr,
    });
  }

  if !stderr.is_empty() {
    // Diagnostics such as --debug-includes go to stderr on success too.
    debug!(stderr = %stderr, "generator diagnostics");
  }

  Ok(stdout)
}
