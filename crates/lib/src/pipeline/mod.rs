//! The two generation pipelines.
//!
//! - [`headers`]: generator per header, metadata output, include rewriting
//! - [`sources`]: generator per source in self-include mode, exposed as a compilation context
//!
//! Both validate their inputs completely before recording anything, then
//! register all of their actions with the [`ActionCtx`](crate::action::ActionCtx)
//! as one batch.

pub mod headers;
pub mod sources;

pub use headers::{HeaderRule, generate_from_headers};
pub use sources::{SourceRule, generate_from_sources};

use thiserror::Error;

use crate::action::ActionError;
use crate::artifact::{InputError, normalize_relative};
use crate::rewrite::RewriteError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  #[error(transparent)]
  Input(#[from] InputError),

  #[error(transparent)]
  Rewrite(#[from] RewriteError),

  #[error(transparent)]
  Action(#[from] ActionError),
}

fn check_rule_name(name: &str) -> Result<(), InputError> {
  if name.is_empty() || name.contains('/') || name.contains('\\') {
    return Err(InputError::InvalidRuleName(name.to_string()));
  }
  Ok(())
}

/// Normalise a package directory; the empty string is the build root.
fn normalize_package(package: &str) -> Result<String, InputError> {
  if package.is_empty() || package == "." {
    return Ok(String::new());
  }
  normalize_relative(package)
}
