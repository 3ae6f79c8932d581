use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::rewrite::IncludeRewriteMap;
use crate::toolchain::Toolchain;
use crate::util::hash::Hashable;

/// One execution of the external generator.
///
/// Every file the generator may read is in `input` or `extra_inputs`; every
/// file it may write is in `outputs`. The executor enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratorInvocation {
  pub mnemonic: String,
  pub tool: PathBuf,
  /// The positional input file.
  pub input: Artifact,
  /// Additional files visible to the generator (sibling headers of the batch).
  pub extra_inputs: Vec<Artifact>,
  /// The generated source or fragment first, then the metadata document if requested.
  pub outputs: Vec<Artifact>,
  /// Ambient include directories the generator searches, as given by the toolchain.
  pub ambient_dirs: Vec<String>,
  pub args: Vec<String>,
}

impl GeneratorInvocation {
  pub fn builder<'a>(mnemonic: &str, toolchain: &'a Toolchain, input: Artifact, output: Artifact) -> InvocationBuilder<'a> {
    InvocationBuilder {
      mnemonic: mnemonic.to_string(),
      toolchain,
      input,
      output,
      metadata: None,
      self_include: false,
      debug_includes: false,
      extra_inputs: Vec::new(),
    }
  }

  /// The generated source (or fragment) this invocation writes.
  pub fn primary_output(&self) -> &Artifact {
    &self.outputs[0]
  }

  /// The input followed by the extra inputs, without repeating the input.
  pub fn inputs(&self) -> Vec<&Artifact> {
    std::iter::once(&self.input)
      .chain(self.extra_inputs.iter().filter(|a| **a != self.input))
      .collect()
  }
}

/// Assembles a [`GeneratorInvocation`] and its argument list.
///
/// Arguments are laid out as: ambient include flags, mode flag, optional
/// debug flag, output flag and path, input path.
pub struct InvocationBuilder<'a> {
  mnemonic: String,
  toolchain: &'a Toolchain,
  input: Artifact,
  output: Artifact,
  metadata: Option<Artifact>,
  self_include: bool,
  debug_includes: bool,
  extra_inputs: Vec<Artifact>,
}

impl InvocationBuilder<'_> {
  /// Request the structured metadata document, declared as `metadata`.
  pub fn with_metadata(mut self, metadata: Artifact) -> Self {
    self.metadata = Some(metadata);
    self
  }

  pub fn with_self_include(mut self) -> Self {
    self.self_include = true;
    self
  }

  pub fn with_debug_includes(mut self, enabled: bool) -> Self {
    self.debug_includes = enabled;
    self
  }

  pub fn with_extra_inputs(mut self, inputs: Vec<Artifact>) -> Self {
    self.extra_inputs = inputs;
    self
  }

  pub fn build(self) -> GeneratorInvocation {
    let flags = &self.toolchain.flags;
    let mut args = self.toolchain.include_args();

    if self.metadata.is_some() {
      args.push(flags.metadata.clone());
    }
    if self.self_include {
      args.push(flags.self_include.clone());
    }
    if self.debug_includes {
      args.push(flags.debug_includes.clone());
    }
    args.push(flags.output.clone());
    args.push(self.output.exec_path.clone());
    args.push(self.input.exec_path.clone());

    let mut outputs = vec![self.output];
    outputs.extend(self.metadata);

    GeneratorInvocation {
      mnemonic: self.mnemonic,
      tool: self.toolchain.generator.clone(),
      input: self.input,
      extra_inputs: self.extra_inputs,
      outputs,
      ambient_dirs: self.toolchain.context.include_dirs.clone(),
      args,
    }
  }
}

/// Literal include substitution over one generated source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewriteIncludes {
  /// Raw generator output.
  pub template: Artifact,
  /// Final source with build-root-relative includes.
  pub output: Artifact,
  pub map: IncludeRewriteMap,
}

/// A unit of work declared to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
  /// Run the generator on one input.
  Generate(GeneratorInvocation),
  /// Rewrite include directives in a generated source.
  RewriteIncludes(RewriteIncludes),
}

impl Hashable for Action {}

impl Action {
  pub fn mnemonic(&self) -> &str {
    match self {
      Action::Generate(inv) => &inv.mnemonic,
      Action::RewriteIncludes(_) => "MocRewriteIncludes",
    }
  }

  pub fn inputs(&self) -> Vec<&Artifact> {
    match self {
      Action::Generate(inv) => inv.inputs(),
      Action::RewriteIncludes(rw) => vec![&rw.template],
    }
  }

  pub fn outputs(&self) -> Vec<&Artifact> {
    match self {
      Action::Generate(inv) => inv.outputs.iter().collect(),
      Action::RewriteIncludes(rw) => vec![&rw.output],
    }
  }

  /// Short human-readable label, e.g. `MocHeader widget.h`.
  pub fn describe(&self) -> String {
    match self {
      Action::Generate(inv) => format!("{} {}", inv.mnemonic, inv.input),
      Action::RewriteIncludes(rw) => format!("{} {}", self.mnemonic(), rw.output),
    }
  }
}
