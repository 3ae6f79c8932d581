//! Include-directive rewriting for generated sources.
//!
//! The generator assumes every header it includes lives next to the file it
//! writes, so it emits `#include "baz.h"`. The build graph addresses files by
//! their path from the build root (`#include "bar/baz.h"`). An
//! [`IncludeRewriteMap`] records that translation for one batch of headers and
//! [`rewrite`] applies it as a literal substitution of quoted strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::Artifact;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
  /// Two headers in one batch share a basename, so `"<basename>"` is ambiguous.
  #[error("headers {first} and {second} share the basename '{basename}'; includes of it cannot be rewritten unambiguously")]
  BasenameCollision {
    basename: String,
    first: String,
    second: String,
  },
}

/// Quoted basename to quoted build-root-relative path, e.g. `"baz.h"` to `"bar/baz.h"`.
///
/// Built from a full batch of headers; construction fails on basename collisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludeRewriteMap {
  entries: BTreeMap<String, String>,
}

impl IncludeRewriteMap {
  /// Build the map for a batch of headers.
  ///
  /// Generated headers map to their short path, which is how they are
  /// included once the output directory is on the include path.
  pub fn from_headers(headers: &[Artifact]) -> Result<Self, RewriteError> {
    let mut entries: BTreeMap<String, String> = BTreeMap::new();
    let mut owners: BTreeMap<&str, &Artifact> = BTreeMap::new();

    for header in headers {
      let basename = header.basename();
      if let Some(previous) = owners.insert(basename, header) {
        return Err(RewriteError::BasenameCollision {
          basename: basename.to_string(),
          first: previous.short_path.clone(),
          second: header.short_path.clone(),
        });
      }
      entries.insert(quote(basename), quote(&header.short_path));
    }

    Ok(Self { entries })
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}

fn quote(s: &str) -> String {
  format!("\"{}\"", s)
}

/// Replace every quoted string in `source` that is a key of `map` with its value.
///
/// Substitution is a single left-to-right pass, so replacement text is never
/// rescanned. Bytes outside a matched string are copied through unchanged,
/// whatever their encoding.
pub fn rewrite_bytes(source: &[u8], map: &IncludeRewriteMap) -> Vec<u8> {
  if map.is_empty() {
    return source.to_vec();
  }

  let mut out = Vec::with_capacity(source.len());
  let mut rest = source;

  while let Some(open) = rest.iter().position(|&b| b == b'"') {
    out.extend_from_slice(&rest[..open]);
    let candidate = &rest[open..];

    let replaced = candidate[1..]
      .iter()
      .position(|&b| b == b'"')
      .map(|close| &candidate[..close + 2])
      .and_then(|quoted| {
        let key = std::str::from_utf8(quoted).ok()?;
        map.get(key).map(|target| (quoted.len(), target))
      });

    match replaced {
      Some((consumed, target)) => {
        out.extend_from_slice(target.as_bytes());
        rest = &candidate[consumed..];
      }
      None => {
        out.push(b'"');
        rest = &candidate[1..];
      }
    }
  }

  out.extend_from_slice(rest);
  out
}

/// [`rewrite_bytes`] over text.
pub fn rewrite(source: &str, map: &IncludeRewriteMap) -> String {
  // Splices only happen at ASCII quotes, so UTF-8 in stays UTF-8 out.
  match String::from_utf8(rewrite_bytes(source.as_bytes(), map)) {
    Ok(text) => text,
    Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn headers(paths: &[&str]) -> Vec<Artifact> {
    paths.iter().map(|p| Artifact::source(p).unwrap()).collect()
  }

  #[test]
  fn map_for_distinct_basenames() {
    let map = IncludeRewriteMap::from_headers(&headers(&["foo.h", "bar/baz.h"])).unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map.get("\"foo.h\""), Some("\"foo.h\""));
    assert_eq!(map.get("\"baz.h\""), Some("\"bar/baz.h\""));
  }

  #[test]
  fn colliding_basenames_are_rejected() {
    let err = IncludeRewriteMap::from_headers(&headers(&["a/widget.h", "b/widget.h"])).unwrap_err();

    assert_eq!(
      err,
      RewriteError::BasenameCollision {
        basename: "widget.h".to_string(),
        first: "a/widget.h".to_string(),
        second: "b/widget.h".to_string(),
      }
    );
  }

  #[test]
  fn same_stem_different_extension_is_not_a_collision() {
    let map = IncludeRewriteMap::from_headers(&headers(&["a/widget.h", "b/widget.hpp"])).unwrap();
    assert_eq!(map.len(), 2);
  }

  #[test]
  fn rewrites_sibling_include() {
    let map = IncludeRewriteMap::from_headers(&headers(&["foo.h", "bar/baz.h"])).unwrap();
    let generated = "#include \"baz.h\"\n#include <QtCore/qobject.h>\n";

    assert_eq!(
      rewrite(generated, &map),
      "#include \"bar/baz.h\"\n#include <QtCore/qobject.h>\n"
    );
  }

  #[test]
  fn rewrites_every_occurrence_once() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    let generated = "#include \"baz.h\"\n// see \"baz.h\"\n";

    let out = rewrite(generated, &map);

    assert_eq!(out, "#include \"bar/baz.h\"\n// see \"bar/baz.h\"\n");
    assert_eq!(out.matches("\"bar/baz.h\"").count(), 2);
  }

  #[test]
  fn no_matches_is_a_no_op() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    let generated = "#include \"other.h\"\nstatic const char *s = \"baz.hh\";\n";

    assert_eq!(rewrite(generated, &map), generated);
  }

  #[test]
  fn unquoted_and_angle_includes_are_untouched() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    let generated = "#include <baz.h>\n// baz.h\n";

    assert_eq!(rewrite(generated, &map), generated);
  }

  #[test]
  fn replacement_is_not_rescanned() {
    // "a.h" -> "x/a.h" must not feed back into another substitution.
    let map = IncludeRewriteMap::from_headers(&headers(&["x/a.h", "y/x.h"])).unwrap();
    assert_eq!(rewrite("\"a.h\"", &map), "\"x/a.h\"");
  }

  #[test]
  fn unterminated_quote_is_copied() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    let generated = "const char *s = \"baz.h";

    assert_eq!(rewrite(generated, &map), generated);
  }

  #[test]
  fn adjacent_strings() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    assert_eq!(rewrite("\"x\" \"baz.h\"", &map), "\"x\" \"bar/baz.h\"");
  }

  #[test]
  fn multibyte_text_survives() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    let generated = "// Größe \"baz.h\" ✓\n";

    assert_eq!(rewrite(generated, &map), "// Größe \"bar/baz.h\" ✓\n");
  }

  #[test]
  fn non_utf8_bytes_pass_through() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    let generated = b"#include \"baz.h\"\nstatic const char *s = \"caf\xe9\";\n";

    assert_eq!(
      rewrite_bytes(generated, &map),
      b"#include \"bar/baz.h\"\nstatic const char *s = \"caf\xe9\";\n".to_vec()
    );
  }

  #[test]
  fn non_utf8_inside_candidate_string_never_matches() {
    let map = IncludeRewriteMap::from_headers(&headers(&["bar/baz.h"])).unwrap();
    let generated = b"\"baz\xff.h\" \"baz.h\"";

    assert_eq!(rewrite_bytes(generated, &map), b"\"baz\xff.h\" \"bar/baz.h\"".to_vec());
  }
}
