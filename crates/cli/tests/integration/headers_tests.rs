//! Tests for `mocgraph headers`.

use predicates::prelude::*;
use serial_test::serial;

use super::common::{FAILING_GENERATOR, FAKE_GENERATOR, TestEnv};

#[test]
#[serial]
fn headers_generate_rewritten_sources() {
  let env = TestEnv::new();
  env.write_file("foo.h", "#include \"baz.h\"\nclass Foo;\n");
  env.write_file("bar/baz.h", "class Baz;\n");
  let moc = env.tool("moc", FAKE_GENERATOR);

  env
    .command(&moc)
    .args(["headers", "--name", "widgets", "--root"])
    .arg(env.root())
    .args(["foo.h", "bar/baz.h"])
    .assert()
    .success()
    .stdout(predicate::str::contains("mocgraph-out/moc_foo.cpp"));

  assert_eq!(
    env.read_file("mocgraph-out/moc_foo.cpp"),
    "#include \"foo.h\"\n#include \"bar/baz.h\"\n"
  );
  assert_eq!(env.read_file("mocgraph-out/moc_baz.cpp"), "#include \"bar/baz.h\"\n");
  assert_eq!(
    env.read_file("mocgraph-out/_widgets_moc/moc_foo.cpp.json"),
    "{\"inputFile\":\"foo.h\"}\n"
  );
}

#[test]
#[serial]
fn headers_json_lists_bundle_and_cache_on_rerun() {
  let env = TestEnv::new();
  env.write_file("ui/widget.h", "");
  let moc = env.tool("moc", FAKE_GENERATOR);

  let run = || {
    env
      .command(&moc)
      .args(["headers", "--package", "ui", "--output", "json", "--root"])
      .arg(env.root())
      .arg("ui/widget.h")
      .output()
      .unwrap()
  };

  let first = run();
  assert!(first.status.success());
  let json: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
  assert_eq!(
    json["default_outputs"]["files"][0]["exec_path"],
    "mocgraph-out/ui/moc_widget.cpp"
  );
  assert_eq!(
    json["bundle"]["entries"][0]["metadata"]["exec_path"],
    "mocgraph-out/ui/_moc_moc/moc_widget.cpp.json"
  );
  assert_eq!(json["execution"]["cached"], 0);

  let second = run();
  let json: serde_json::Value = serde_json::from_slice(&second.stdout).unwrap();
  assert_eq!(json["execution"]["cached"], 2);
}

#[test]
#[serial]
fn generator_failure_names_the_header() {
  let env = TestEnv::new();
  env.write_file("widget.h", "class Widget {};\n");
  let moc = env.tool("moc", FAILING_GENERATOR);

  env
    .command(&moc)
    .args(["headers", "--root"])
    .arg(env.root())
    .arg("widget.h")
    .assert()
    .failure()
    .stderr(predicate::str::contains("widget.h:12: Error: Class declaration lacks Q_OBJECT macro."))
    .stderr(predicate::str::contains("1 of 2 action(s) failed"));

  assert!(!env.root().join("mocgraph-out/moc_widget.cpp").exists());
}

#[test]
#[serial]
fn basename_collision_fails_before_running() {
  let env = TestEnv::new();
  env.write_file("a/util.h", "");
  env.write_file("b/util.h", "");
  let moc = env.tool("moc", FAKE_GENERATOR);

  env
    .command(&moc)
    .args(["headers", "--root"])
    .arg(env.root())
    .args(["a/util.h", "b/util.h"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("share the basename 'util.h'"));

  assert!(!env.root().join("mocgraph-out").exists());
}

#[test]
#[serial]
fn toolchain_file_is_used() {
  let env = TestEnv::new();
  env.write_file("foo.h", "");
  let moc = env.tool("moc", FAKE_GENERATOR);
  let toolchain = env.tools.path().join("toolchain.json");
  std::fs::write(
    &toolchain,
    serde_json::json!({ "generator": moc, "include_dirs": ["/opt/qt/include"] }).to_string(),
  )
  .unwrap();

  let output = env
    .command(std::path::Path::new("/does/not/exist"))
    .args(["headers", "--dry-run", "--toolchain"])
    .arg(&toolchain)
    .arg("--root")
    .arg(env.root())
    .arg("foo.h")
    .output()
    .unwrap();

  assert!(output.status.success());
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(plan["actions"][0]["tool"], moc.display().to_string());
  assert_eq!(plan["actions"][0]["args"][0], "-I/opt/qt/include");
}
