//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Generator stand-in: copies quoted includes of the input into the output,
/// after an include of the input's basename. Only shell builtins are used
/// since the generator runs with `PATH` cleared.
pub const FAKE_GENERATOR: &str = r#"#!/bin/sh
out=""
input=""
json=0
self_include=0
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --output-json) json=1; shift ;;
    -i) self_include=1; shift ;;
    -I*|--debug-includes) shift ;;
    *) input="$1"; shift ;;
  esac
done
name="${input##*/}"
if [ "$self_include" = 1 ]; then
  printf '/* fragment for %s */\n' "$name" > "$out"
  exit 0
fi
printf '#include "%s"\n' "$name" > "$out"
while IFS= read -r line; do
  case "$line" in
    '#include "'*) printf '%s\n' "$line" >> "$out" ;;
  esac
done < "$input"
if [ "$json" = 1 ]; then
  printf '{"inputFile":"%s"}\n' "$name" > "$out.json"
fi
"#;

pub const FAILING_GENERATOR: &str = r#"#!/bin/sh
for arg in "$@"; do last="$arg"; done
echo "$last:12: Error: Class declaration lacks Q_OBJECT macro." >&2
exit 1
"#;

/// Isolated test environment.
///
/// Each test gets its own build root and a separate directory for tools.
pub struct TestEnv {
  pub root: TempDir,
  pub tools: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      root: TempDir::new().unwrap(),
      tools: TempDir::new().unwrap(),
    }
  }

  pub fn root(&self) -> &Path {
    self.root.path()
  }

  /// Write a file relative to the build root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.root.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn read_file(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.root.path().join(relative_path)).unwrap()
  }

  /// Install an executable script and return its path.
  pub fn tool(&self, name: &str, body: &str) -> PathBuf {
    let path = self.tools.path().join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  /// A mocgraph command rooted at this environment, using `generator`.
  pub fn command(&self, generator: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("mocgraph");
    cmd
      .env_remove("RUST_LOG")
      .env("MOCGRAPH_GENERATOR", generator)
      .env_remove("MOCGRAPH_INCLUDE_DIRS");
    cmd
  }
}
