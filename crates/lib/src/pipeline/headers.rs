//! Header pipeline: one companion source and one metadata document per header.
//!
//! For a header `bar/baz.h` in rule `name` of package `pkg`, three files are
//! declared under the output directory:
//!
//! - `pkg/_name_moc/moc_baz.cpp`: raw generator output
//! - `pkg/_name_moc/moc_baz.cpp.json`: metadata document
//! - `pkg/moc_baz.cpp`: raw output with includes rewritten
//!
//! Every header of the batch is visible to every invocation, because the
//! generator may follow includes between them.

use tracing::{debug, info};

use crate::action::{Action, ActionCtx, GeneratorInvocation, RewriteIncludes};
use crate::artifact::{Artifact, FileKind, join, validate_inputs};
use crate::consts::{GENERATED_PREFIX, GENERATED_SOURCE_EXT, METADATA_SUFFIX};
use crate::provider::{DefaultOutputs, GeneratedArtifactBundle, GeneratedHeader, HeaderOutputs};
use crate::rewrite::IncludeRewriteMap;
use crate::toolchain::Toolchain;

use super::{PlanError, check_rule_name, normalize_package};

pub const MNEMONIC: &str = "MocHeader";

/// A header-generation rule.
#[derive(Debug, Clone)]
pub struct HeaderRule {
  pub name: String,
  /// Directory, relative to the output directory, that receives the generated sources.
  pub package: String,
  pub hdrs: Vec<Artifact>,
  pub debug_includes: bool,
}

impl HeaderRule {
  pub fn new(name: &str, hdrs: Vec<Artifact>) -> Self {
    Self {
      name: name.to_string(),
      package: String::new(),
      hdrs,
      debug_includes: false,
    }
  }

  pub fn with_package(mut self, package: &str) -> Self {
    self.package = package.to_string();
    self
  }

  pub fn with_debug_includes(mut self, enabled: bool) -> Self {
    self.debug_includes = enabled;
    self
  }
}

/// Declare generation and include rewriting for every header of `rule`.
///
/// # Errors
///
/// - [`PlanError::Input`] for an empty list, a non-header extension, a duplicate
///   entry or an invalid rule name/package
/// - [`PlanError::Rewrite`] when two headers share a basename
/// - [`PlanError::Action`] when a generated file is already claimed, e.g. by
///   `foo.h` and `foo.hpp` in the same rule
///
/// On error nothing is recorded in `ctx`.
pub fn generate_from_headers(
  ctx: &mut ActionCtx,
  toolchain: &Toolchain,
  rule: &HeaderRule,
) -> Result<HeaderOutputs, PlanError> {
  check_rule_name(&rule.name)?;
  let package = normalize_package(&rule.package)?;
  validate_inputs(FileKind::Header, &rule.hdrs)?;
  let map = IncludeRewriteMap::from_headers(&rule.hdrs)?;

  let scratch_dir = join(&package, &format!("_{}_moc", rule.name));
  let mut actions = Vec::with_capacity(rule.hdrs.len() * 2);
  let mut entries = Vec::with_capacity(rule.hdrs.len());

  for header in &rule.hdrs {
    let file_name = format!("{}{}.{}", GENERATED_PREFIX, header.stem(), GENERATED_SOURCE_EXT);
    let raw = ctx.declare_file(&join(&scratch_dir, &file_name));
    let metadata = ctx.declare_file(&format!("{}{}", raw.short_path, METADATA_SUFFIX));
    let source = ctx.declare_file(&join(&package, &file_name));

    let invocation = GeneratorInvocation::builder(MNEMONIC, toolchain, header.clone(), raw.clone())
      .with_metadata(metadata.clone())
      .with_debug_includes(rule.debug_includes)
      .with_extra_inputs(rule.hdrs.clone())
      .build();
    debug!(header = %header, args = ?invocation.args, "declared generator invocation");

    actions.push(Action::Generate(invocation));
    actions.push(Action::RewriteIncludes(RewriteIncludes {
      template: raw,
      output: source.clone(),
      map: map.clone(),
    }));
    entries.push(GeneratedHeader {
      header: header.clone(),
      source,
      metadata,
    });
  }

  ctx.register(actions)?;
  info!(rule = %rule.name, headers = rule.hdrs.len(), "declared header generation");

  let bundle = GeneratedArtifactBundle { entries };
  Ok(HeaderOutputs {
    default_outputs: DefaultOutputs {
      files: bundle.sources().cloned().collect(),
    },
    bundle,
  })
}
