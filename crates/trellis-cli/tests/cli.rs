use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const LAYOUT: &str = r#"
[[context]]
name = "team"
label = "Team"

[[node]]
name = "alice"
context = "team"
label = "Alice"

[[node]]
name = "bob"
label = "Bob"

[[edge]]
from = "alice"
to = "bob"
"#;

fn trellis(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("trellis").unwrap();
    cmd.env("TRELLIS_CONFIG", dir.path().join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn id_generate_prints_tagged_identifiers() {
    let dir = TempDir::new().unwrap();
    let output = trellis(&dir)
        .args(["id", "generate", "--kind", "edge", "-n", "3"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        assert_eq!(line.len(), 32);
        assert!(line.starts_with("03"));
    }
}

#[test]
fn id_parse_rejects_malformed_text() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["id", "parse", "not-hex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed identifier"));
}

#[test]
fn id_root_is_all_zero() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["id", "root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("00000000000000000000000000000000 root"));
}

#[test]
fn build_reports_cascade_as_json() {
    let dir = TempDir::new().unwrap();
    let layout = dir.path().join("layout.toml");
    std::fs::write(&layout, LAYOUT).unwrap();

    let output = trellis(&dir)
        .args(["--format", "json", "build"])
        .arg(&layout)
        .args(["--remove", "team"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["removed"][0], "team");
    assert_eq!(report["edges"][0]["orphaned"], true);
    let bob = report["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["name"] == "bob")
        .unwrap();
    assert_eq!(bob["context"], "00000000000000000000000000000000");
    assert!(bob["edge_list"]["in"].as_array().unwrap().is_empty());
}

#[test]
fn build_text_renders_tree() {
    let dir = TempDir::new().unwrap();
    let layout = dir.path().join("layout.toml");
    std::fs::write(&layout, LAYOUT).unwrap();

    trellis(&dir)
        .arg("build")
        .arg(&layout)
        .assert()
        .success()
        .stdout(predicate::str::contains("team [Team]"))
        .stdout(predicate::str::contains("alice [Alice]"));
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["config", "set", "default_kind", "graph"])
        .assert()
        .success();
    trellis(&dir)
        .args(["config", "get", "default_kind"])
        .assert()
        .success()
        .stdout("graph\n");

    let output = trellis(&dir).args(["id", "generate"]).output().unwrap();
    assert!(String::from_utf8(output.stdout).unwrap().starts_with("01"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    trellis(&dir).args(["config", "init"]).assert().success();
    trellis(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    trellis(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn completions_name_the_binary() {
    let dir = TempDir::new().unwrap();
    trellis(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trellis"));
}

#[test]
fn build_sample_layout_removes_nested_context() {
    let dir = TempDir::new().unwrap();
    let layout = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/team.toml");

    let output = trellis(&dir)
        .args(["--format", "json", "build"])
        .arg(&layout)
        .args(["--remove", "engineering"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let edges = report["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|e| e["orphaned"] == true));
}
