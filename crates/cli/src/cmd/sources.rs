//! Implementation of the `mocgraph sources` command.
//!
//! Runs the generator in self-include mode for each source and prints the
//! compilation context a compile step needs to find the fragments.

use anyhow::{Context, Result};

use mocgraph_lib::pipeline::{SourceRule, generate_from_sources};

use super::BuildArgs;
use crate::output::{print_json, print_stat, print_success, symbols};

pub fn cmd_sources(name: &str, debug_includes: bool, srcs: &[String], args: &BuildArgs) -> Result<()> {
  let tree = args.source_tree()?;
  let toolchain = args.resolve_toolchain()?;
  let srcs = tree.resolve_all(srcs).context("Invalid source list")?;

  let rule = SourceRule::new(name, srcs).with_debug_includes(debug_includes);
  let mut ctx = args.action_ctx()?;
  let context = generate_from_sources(&mut ctx, &toolchain, &rule)
    .with_context(|| format!("Failed to declare rule {}", name))?;
  let plan = ctx.into_plan();

  if args.dry_run {
    return print_json(&plan);
  }

  let execution = args.execute(&plan, tree.root())?;

  if args.output.is_json() {
    print_json(&serde_json::json!({
      "compilation_context": context,
      "execution": execution.to_json(),
    }))?;
  } else if execution.result.is_success() {
    print_success(&format!("Generated {} fragment(s) for {}", context.headers.len(), name));
    for fragment in &context.headers {
      println!("  {} {}", symbols::INFO, fragment.exec_path);
    }
    println!();
    print_stat("Include dirs", &context.include_dirs.join(" "));
    execution.print_summary();
  }

  execution.ensure_success(args.output)
}
