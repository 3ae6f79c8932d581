//! Implementation of the `mocgraph headers` command.
//!
//! Declares one generator and one include-rewrite action per header, runs them,
//! and prints the compilable sources and metadata documents they produce.

use anyhow::{Context, Result};

use mocgraph_lib::pipeline::{HeaderRule, generate_from_headers};

use super::BuildArgs;
use crate::output::{print_info, print_json, print_stat, print_success, symbols};

pub fn cmd_headers(name: &str, package: &str, debug_includes: bool, hdrs: &[String], args: &BuildArgs) -> Result<()> {
  let tree = args.source_tree()?;
  let toolchain = args.resolve_toolchain()?;
  let hdrs = tree.resolve_all(hdrs).context("Invalid header list")?;

  let rule = HeaderRule::new(name, hdrs)
    .with_package(package)
    .with_debug_includes(debug_includes);
  let mut ctx = args.action_ctx()?;
  let outputs = generate_from_headers(&mut ctx, &toolchain, &rule)
    .with_context(|| format!("Failed to declare rule {}", name))?;
  let plan = ctx.into_plan();

  if args.dry_run {
    return print_json(&plan);
  }

  let execution = args.execute(&plan, tree.root())?;

  if args.output.is_json() {
    print_json(&serde_json::json!({
      "default_outputs": outputs.default_outputs,
      "bundle": outputs.bundle,
      "execution": execution.to_json(),
    }))?;
  } else if execution.result.is_success() {
    print_success(&format!(
      "Generated {} source(s) for {}",
      outputs.default_outputs.files.len(),
      name
    ));
    for entry in &outputs.bundle.entries {
      println!("  {} {} {}", entry.header.short_path, symbols::ARROW, entry.source.exec_path);
    }
    println!();
    for metadata in outputs.bundle.metadata() {
      print_info(&format!("metadata {}", metadata.exec_path));
    }
    print_stat("Headers", &outputs.bundle.entries.len().to_string());
    execution.print_summary();
  }

  execution.ensure_success(args.output)
}
