//! Test utilities for mocgraph-lib.
//!
//! Fake generator scripts and scratch build roots. The scripts only use shell
//! builtins because generator actions run with `PATH` cleared.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A generator stand-in that honours the default flag spellings.
///
/// Pipeline A mode writes `#include "<basename>"` followed by every quoted
/// include found in the input, and `<out>.json` when `--output-json` is given.
/// Self-include mode (`-i`) writes a one-line fragment.
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
    --debug-includes) shift ;;
    -I*) shift ;;
    *) input="$1"; shift ;;
  esac
done
if [ ! -f "$input" ]; then
  echo "moc: $input: No such file" >&2
  exit 1
fi
name="${input##*/}"
if [ "$self_include" = 1 ]; then
  printf '/* fragment for %s */\n' "$name" > "$out"
else
  printf '#include "%s"\n' "$name" > "$out"
  while IFS= read -r line; do
    case "$line" in
      '#include "'*) printf '%s\n' "$line" >> "$out" ;;
    esac
  done < "$input"
fi
if [ "$json" = 1 ]; then
  printf '{"inputFile":"%s"}\n' "$name" > "$out.json"
fi
"#;

/// A generator that rejects every input the way the real tool reports a parse error.
pub const FAILING_GENERATOR: &str = r#"#!/bin/sh
echo "Error: Class declaration lacks Q_OBJECT macro." >&2
exit 1
"#;

/// A generator that succeeds without writing anything.
pub const SILENT_GENERATOR: &str = "#!/bin/sh\nexit 0\n";

/// Write an executable script into `dir` and return its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  std::fs::write(&path, body).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// A scratch build root with a separate directory for tools.
pub struct Scratch {
  pub root: TempDir,
  pub tools: TempDir,
}

impl Scratch {
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
  pub fn write(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.root.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  #[cfg(unix)]
  pub fn tool(&self, name: &str, body: &str) -> PathBuf {
    write_script(self.tools.path(), name, body)
  }
}
