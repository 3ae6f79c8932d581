//! Tests for `mocgraph sources`.

use predicates::prelude::*;
use serial_test::serial;

use super::common::{FAKE_GENERATOR, TestEnv};

#[test]
#[serial]
fn sources_generate_fragments() {
  let env = TestEnv::new();
  env.write_file("app/thing.cpp", "#include \"thing.moc\"\n");
  let moc = env.tool("moc", FAKE_GENERATOR);

  env
    .command(&moc)
    .args(["sources", "--root"])
    .arg(env.root())
    .arg("app/thing.cpp")
    .assert()
    .success()
    .stdout(predicate::str::contains("mocgraph-out/app/thing.moc"));

  assert_eq!(
    env.read_file("mocgraph-out/app/thing.moc"),
    "/* fragment for thing.cpp */\n"
  );
}

#[test]
#[serial]
fn sources_json_exposes_compilation_context() {
  let env = TestEnv::new();
  env.write_file("thing.cpp", "");
  let moc = env.tool("moc", FAKE_GENERATOR);

  let output = env
    .command(&moc)
    .args(["sources", "--output", "json", "--no-sandbox", "--root"])
    .arg(env.root())
    .arg("thing.cpp")
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["compilation_context"]["include_dirs"][0], "mocgraph-out");
  assert_eq!(
    json["compilation_context"]["headers"][0]["exec_path"],
    "mocgraph-out/thing.moc"
  );
}

#[test]
#[serial]
fn sources_reject_header_input() {
  let env = TestEnv::new();
  env.write_file("thing.h", "");
  let moc = env.tool("moc", FAKE_GENERATOR);

  env
    .command(&moc)
    .args(["sources", "--root"])
    .arg(env.root())
    .arg("thing.h")
    .assert()
    .failure()
    .stderr(predicate::str::contains("unsupported extension"));
}
