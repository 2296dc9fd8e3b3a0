//! End-to-end runs of the `treewalk` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn treewalk(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_treewalk"))
        .args(args)
        .current_dir(dir)
        .env("TREEWALK_CONFIG_DIR", dir.join("no-global"))
        .output()
        .unwrap()
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("treewalk.toml"),
        r#"
[checker]
threads = 2

[[module]]
name = "EmptyBlock"

[[module]]
name = "IllegalToken"
tokens = ["LITERAL_BREAK"]
severity = "warning"
"#,
    )
    .unwrap();
    fs::create_dir(tmp.path().join("src")).unwrap();
    fs::write(
        tmp.path().join("src/A.java"),
        "class A {\n  void m(int i) {\n    while (i > 0) { break; }\n    if (i == 0) { }\n  }\n}\n",
    )
    .unwrap();
    fs::write(tmp.path().join("src/B.java"), "class B {\n  static { }\n}\n").unwrap();
    tmp
}

#[test]
fn exit_code_counts_errors() {
    let tmp = project();
    let out = treewalk(tmp.path(), &["check", "--format", "compact", "src"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert_eq!(out.status.code(), Some(2), "{stdout}");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{stdout}");
    assert!(lines[0].contains("A.java:3:21: warning [IllegalToken]"), "{stdout}");
    assert!(lines[1].contains("A.java:4:17: error [EmptyBlock]"), "{stdout}");
    assert!(lines[2].contains("B.java:2:10: error [EmptyBlock]"), "{stdout}");
}

#[test]
fn json_output_is_parseable() {
    let tmp = project();
    let out = treewalk(tmp.path(), &["check", "--format", "json", "--exclude", "src/B.java", "src"]);
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["files_checked"], 1);
    assert_eq!(value["threshold_count"], 1);
    assert_eq!(value["violations"].as_array().unwrap().len(), 2);
}

#[test]
fn configuration_errors_are_fatal() {
    let tmp = project();
    fs::write(tmp.path().join("treewalk.toml"), "[[module]]\nname = \"NoSuchCheck\"\n").unwrap();
    let out = treewalk(tmp.path(), &["check", "src"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("NoSuchCheck"));
}

#[test]
fn tree_prints_nodes() {
    let tmp = project();
    let out = treewalk(tmp.path(), &["tree", "src/B.java"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("STATIC_INIT"), "{stdout}");
}
