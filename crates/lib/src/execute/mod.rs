//! Plan execution.
//!
//! This module runs the actions of a [`Plan`] against a build root. It handles:
//! - DAG-based dependency ordering
//! - Parallel execution of independent actions
//! - Sandboxed generator runs
//! - Stamp-based reuse of unchanged outputs
//! - Failure propagation and skip tracking

pub mod cache;
pub mod dag;
pub mod generator;
pub mod sandbox;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::action::{Action, GeneratorInvocation, Plan, RewriteIncludes};
use crate::consts::{SANDBOX_DIR, STATE_DIR};
use crate::rewrite::rewrite_bytes;
use crate::util::hash::{ContentHash, Hashable, ObjectHash, hash_file};

use generator::{resolve_tool, run_generator};
use sandbox::Sandbox;

pub use dag::ExecutionDag;
pub use types::{ActionResult, ExecuteConfig, ExecuteError, FailedAction, PlanResult};

/// Where and how the actions of one plan run.
struct ActionEnv {
  build_root: PathBuf,
  state_dir: PathBuf,
  sandbox: bool,
}

/// Execute every action of a plan.
///
/// This is the main entry point for execution. It:
/// 1. Constructs a DAG from the plan
/// 2. Computes parallel execution waves
/// 3. Executes actions wave by wave, with parallelism within each wave
/// 4. Removes the outputs of failed actions and skips their dependents
///
/// Unless `config.keep_going` is set, no new action starts after the first
/// failure. Errors that prevent execution as a whole (a dependency cycle, an
/// unhashable action) are returned as `Err`; per-action failures are recorded
/// in the [`PlanResult`].
pub async fn execute_plan(plan: &Plan, build_root: &Path, config: &ExecuteConfig) -> Result<PlanResult, ExecuteError> {
  info!(action_count = plan.actions.len(), "starting plan execution");

  let dag = ExecutionDag::from_plan(plan)?;
  let waves = dag.waves();
  let keys = plan
    .actions
    .iter()
    .map(|a| a.compute_hash())
    .collect::<Result<Vec<_>, _>>()?;
  let tool_hashes = hash_tools(plan, build_root);

  info!(wave_count = waves.len(), "computed execution waves");

  let env = Arc::new(ActionEnv {
    build_root: build_root.to_path_buf(),
    state_dir: build_root.join(&plan.out_dir).join(STATE_DIR),
    sandbox: config.sandbox,
  });
  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));

  let mut result = PlanResult::default();
  // Action index to the failed action that blocks it.
  let mut blocked: HashMap<usize, usize> = HashMap::new();
  let mut halted_by: Option<usize> = None;

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, actions = wave.len(), "executing wave");

    let mut join_set = JoinSet::new();
    let mut pending = HashSet::new();

    for &idx in wave {
      if let Some(&cause) = blocked.get(&idx).or(halted_by.as_ref()) {
        warn!(
          action = %plan.actions[idx].describe(),
          failed_dep = %keys[cause],
          "skipping action due to failed dependency"
        );
        result.skipped.insert(keys[idx].clone(), keys[cause].clone());
        continue;
      }

      let action = plan.actions[idx].clone();
      let key = keys[idx].clone();
      let tool_hash = match &action {
        Action::Generate(inv) => tool_hashes.get(&inv.tool).cloned(),
        Action::RewriteIncludes(_) => None,
      };
      let env = env.clone();
      let semaphore = semaphore.clone();
      pending.insert(idx);

      join_set.spawn(async move {
        let outcome = match semaphore.acquire().await {
          Ok(_permit) => run_action(&action, key, tool_hash.as_ref(), &env).await,
          Err(e) => Err(ExecuteError::Task(e.to_string())),
        };
        (idx, outcome)
      });
    }

    let mut failures = Vec::new();
    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((idx, Ok(action_result))) => {
          pending.remove(&idx);
          info!(action = %action_result.description, cached = action_result.cached, "action succeeded");
          result.completed.insert(keys[idx].clone(), action_result);
        }
        Ok((idx, Err(e))) => {
          pending.remove(&idx);
          failures.push((idx, e));
        }
        Err(e) => {
          error!(error = %e, "action task panicked");
        }
      }
    }
    // Tasks that never reported back panicked or were cancelled.
    let mut lost: Vec<usize> = pending.into_iter().collect();
    lost.sort_unstable();
    failures.extend(lost.into_iter().map(|idx| (idx, ExecuteError::Task("task did not complete".to_string()))));
    failures.sort_by_key(|(idx, _)| *idx);

    for (idx, e) in failures {
      let action = &plan.actions[idx];
      error!(action = %action.describe(), error = %e, "action failed");
      remove_outputs(build_root, action);

      for dependent in dag.dependents(idx) {
        blocked.entry(dependent).or_insert(idx);
      }
      if !config.keep_going && halted_by.is_none() {
        halted_by = Some(idx);
      }
      result.failed.push(FailedAction {
        key: keys[idx].clone(),
        description: action.describe(),
        error: e,
      });
    }
  }

  info!(
    completed = result.completed.len(),
    cached = result.cached_count(),
    failed = result.failed.len(),
    skipped = result.skipped.len(),
    "plan execution complete"
  );

  Ok(result)
}

/// Run or reuse a single action.
async fn run_action(
  action: &Action,
  key: ObjectHash,
  tool_hash: Option<&ContentHash>,
  env: &ActionEnv,
) -> Result<ActionResult, ExecuteError> {
  let description = action.describe();
  let outputs: Vec<String> = action.outputs().into_iter().map(|o| o.exec_path.clone()).collect();

  let cache_key = cache::cache_key(&env.build_root, action, &key, tool_hash)?;
  let stamp = cache::stamp_path(&env.state_dir, &key);

  if cache::is_fresh(&env.build_root, &stamp, &cache_key) {
    debug!(action = %description, "cache hit");
    return Ok(ActionResult {
      key,
      description,
      cached: true,
      outputs,
    });
  }

  cache::remove_stamp(&stamp)?;
  remove_outputs(&env.build_root, action);

  match action {
    Action::Generate(invocation) => run_generate(invocation, env, &description).await?,
    Action::RewriteIncludes(rw) => run_rewrite(rw, env).await?,
  }

  cache::write_stamp(&env.build_root, &stamp, &cache_key, action)?;

  Ok(ActionResult {
    key,
    description,
    cached: false,
    outputs,
  })
}

async fn run_generate(invocation: &GeneratorInvocation, env: &ActionEnv, description: &str) -> Result<(), ExecuteError> {
  let tool = resolve_tool(&env.build_root, &invocation.tool);

  if env.sandbox {
    let sandbox = Sandbox::create(&env.state_dir.join(SANDBOX_DIR), &env.build_root, invocation)?;
    run_generator(invocation, &tool, sandbox.exec_root()).await?;
    return sandbox.collect_outputs(&env.build_root, invocation, description);
  }

  for output in &invocation.outputs {
    if let Some(parent) = env.build_root.join(&output.exec_path).parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
  }
  run_generator(invocation, &tool, &env.build_root).await?;

  for output in &invocation.outputs {
    if !env.build_root.join(&output.exec_path).is_file() {
      return Err(ExecuteError::MissingOutput {
        action: description.to_string(),
        path: output.exec_path.clone(),
      });
    }
  }
  Ok(())
}

async fn run_rewrite(action: &RewriteIncludes, env: &ActionEnv) -> Result<(), ExecuteError> {
  let template = tokio::fs::read(env.build_root.join(&action.template.exec_path)).await?;

  let rewritten = rewrite_bytes(&template, &action.map);
  debug!(
    template = %action.template,
    output = %action.output,
    changed = rewritten != template,
    "rewrote includes"
  );

  let dest = env.build_root.join(&action.output.exec_path);
  if let Some(parent) = dest.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  tokio::fs::write(dest, rewritten).await?;
  Ok(())
}

/// Delete whatever is present at the declared outputs of `action`.
fn remove_outputs(build_root: &Path, action: &Action) {
  for output in action.outputs() {
    let path = build_root.join(&output.exec_path);
    match std::fs::remove_file(&path) {
      Ok(()) => debug!(path = %output.exec_path, "removed output"),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => warn!(path = %output.exec_path, error = %e, "failed to remove output"),
    }
  }
}

/// Hash each distinct generator binary once per run.
///
/// Tools that cannot be read are left out; running them reports the error.
fn hash_tools(plan: &Plan, build_root: &Path) -> HashMap<PathBuf, ContentHash> {
  let mut hashes = HashMap::new();
  for action in &plan.actions {
    if let Action::Generate(invocation) = action
      && !hashes.contains_key(&invocation.tool)
      && let Ok(hash) = hash_file(&resolve_tool(build_root, &invocation.tool))
    {
      hashes.insert(invocation.tool.clone(), hash);
    }
  }
  hashes
}
