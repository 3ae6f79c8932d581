//! Implementation of the `mocgraph rewrite` command.
//!
//! Applies the include rewrite of a header rule to one file and prints the
//! result. No generator is involved.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use mocgraph_lib::artifact::{Artifact, FileKind, validate_inputs};
use mocgraph_lib::rewrite::{IncludeRewriteMap, rewrite_bytes};

use crate::output::{OutputFormat, print_json};

pub fn cmd_rewrite(headers: &[String], file: &Path, output: OutputFormat) -> Result<()> {
  let headers = headers
    .iter()
    .map(|h| Artifact::source(h))
    .collect::<Result<Vec<_>, _>>()
    .context("Invalid header list")?;
  validate_inputs(FileKind::Header, &headers).context("Invalid header list")?;
  let map = IncludeRewriteMap::from_headers(&headers).context("Failed to build rewrite map")?;

  let source = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
  let rewritten = rewrite_bytes(&source, &map);

  if output.is_json() {
    print_json(&serde_json::json!({
      "file": file.display().to_string(),
      "map": map,
      "changed": rewritten != source,
      "output": String::from_utf8_lossy(&rewritten),
    }))
  } else {
    std::io::stdout()
      .lock()
      .write_all(&rewritten)
      .context("Failed to write rewritten source")
  }
}
