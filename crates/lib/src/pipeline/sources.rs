//! Source pipeline: self-include fragments exposed as compilation context.
//!
//! `dir/thing.cpp` yields `dir/thing.moc` under the output directory. The
//! source includes it by bare name (`#include "thing.moc"`), so the fragment's
//! directory goes on the include path and no rewriting is needed.

use tracing::{debug, info};

use crate::action::{Action, ActionCtx, GeneratorInvocation};
use crate::artifact::{Artifact, FileKind, join, validate_inputs};
use crate::consts::FRAGMENT_EXT;
use crate::provider::CompilationContext;
use crate::toolchain::Toolchain;

use super::{PlanError, check_rule_name};

pub const MNEMONIC: &str = "MocSource";

/// A source-generation rule.
#[derive(Debug, Clone)]
pub struct SourceRule {
  pub name: String,
  pub srcs: Vec<Artifact>,
  pub debug_includes: bool,
}

impl SourceRule {
  pub fn new(name: &str, srcs: Vec<Artifact>) -> Self {
    Self {
      name: name.to_string(),
      srcs,
      debug_includes: false,
    }
  }

  pub fn with_debug_includes(mut self, enabled: bool) -> Self {
    self.debug_includes = enabled;
    self
  }
}

/// Declare a self-include generator invocation for every source of `rule`.
///
/// The returned context lists the fragments as headers and their directories
/// as include directories. Fragments are never returned as compilable sources.
///
/// On error nothing is recorded in `ctx`.
pub fn generate_from_sources(
  ctx: &mut ActionCtx,
  toolchain: &Toolchain,
  rule: &SourceRule,
) -> Result<CompilationContext, PlanError> {
  check_rule_name(&rule.name)?;
  validate_inputs(FileKind::Source, &rule.srcs)?;

  let mut actions = Vec::with_capacity(rule.srcs.len());
  let mut context = CompilationContext::default();

  for src in &rule.srcs {
    let fragment = ctx.declare_file(&join(src.dirname(), &format!("{}.{}", src.stem(), FRAGMENT_EXT)));

    let invocation = GeneratorInvocation::builder(MNEMONIC, toolchain, src.clone(), fragment.clone())
      .with_self_include()
      .with_debug_includes(rule.debug_includes)
      .build();
    debug!(source = %src, args = ?invocation.args, "declared generator invocation");

    context.add_include_dir(fragment.exec_dirname());
    context.add_header(fragment);
    actions.push(Action::Generate(invocation));
  }

  ctx.register(actions)?;
  info!(rule = %rule.name, sources = rule.srcs.len(), "declared source generation");

  Ok(context)
}
