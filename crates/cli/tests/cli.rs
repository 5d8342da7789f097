//! Binary-level tests against local paths
//!
//! These exercise the strand binary end to end without a server:
//! local-to-local copies, sync, glob, and profile management all work
//! offline.

use std::process::Command;

fn strand() -> Command {
    Command::new(env!("CARGO_BIN_EXE_strand"))
}

#[test]
fn cp_copies_and_guards_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src.txt");
    let dst = dir.path().join("dst.txt");
    std::fs::write(&src, b"hello").unwrap();

    let output = strand()
        .args(["cp", src.to_str().unwrap(), dst.to_str().unwrap()])
        .output()
        .expect("Failed to execute strand");
    assert!(output.status.success(), "{output:?}");
    assert_eq!(std::fs::read(&dst).unwrap(), b"hello");

    // Without --force the second copy must trip the guard (exit 2)
    let output = strand()
        .args(["cp", src.to_str().unwrap(), dst.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    // --skip succeeds without touching the destination
    std::fs::write(&src, b"changed").unwrap();
    let output = strand()
        .args(["cp", "--skip", src.to_str().unwrap(), dst.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(std::fs::read(&dst).unwrap(), b"hello");

    // --force overwrites
    let output = strand()
        .args(["cp", "--force", src.to_str().unwrap(), dst.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(std::fs::read(&dst).unwrap(), b"changed");
}

#[test]
fn cp_json_reports_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("a");
    std::fs::write(&src, b"x").unwrap();
    let dst = dir.path().join("b");

    let output = strand()
        .args(["--json", "cp", src.to_str().unwrap(), dst.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "copied");
}

#[test]
fn cat_prints_contents() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, b"line one\n").unwrap();

    let output = strand()
        .args(["cat", file.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, b"line one\n");
}

#[test]
fn rm_missing_file_exits_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let ghost = dir.path().join("ghost");

    let output = strand()
        .args(["rm", ghost.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn sync_local_trees() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let dst = dir.path().join("dst");
    std::fs::create_dir_all(src.join("sub")).unwrap();
    std::fs::create_dir_all(&dst).unwrap();
    std::fs::write(src.join("a.txt"), b"a").unwrap();
    std::fs::write(src.join("sub/b.txt"), b"b").unwrap();
    std::fs::write(dst.join("stale.txt"), b"s").unwrap();

    let output = strand()
        .args([
            "--json",
            "sync",
            "--delete",
            src.to_str().unwrap(),
            dst.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["copied"], 2);
    assert_eq!(json["removed"], 1);
    assert_eq!(json["errors"], 0);

    assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"a");
    assert_eq!(std::fs::read(dst.join("sub/b.txt")).unwrap(), b"b");
    assert!(!dst.join("stale.txt").exists());
}

#[test]
fn sync_dry_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let dst = dir.path().join("dst");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("new.txt"), b"n").unwrap();

    let output = strand()
        .args([
            "--json",
            "sync",
            "--dry-run",
            src.to_str().unwrap(),
            dst.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["copied"], 1);
    assert!(!dst.join("new.txt").exists());
}

#[test]
fn glob_matches_local_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("one.log"), b"1").unwrap();
    std::fs::write(dir.path().join("two.log"), b"2").unwrap();
    std::fs::write(dir.path().join("skip.txt"), b"3").unwrap();

    let pattern = format!("{}/*.log", dir.path().display());
    let output = strand().args(["--json", "glob", &pattern]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["count"], 2);
}

#[test]
fn ls_lists_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("z.txt"), b"z").unwrap();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let output = strand()
        .args(["--json", "ls", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["a.txt", "z.txt"]);
}

#[test]
fn profile_round_trip() {
    let config_dir = tempfile::tempdir().unwrap();

    let output = strand()
        .args([
            "profile",
            "set",
            "test-profile",
            "http://localhost:9000",
            "accesskey",
            "secretkey",
            "--json",
        ])
        .env("STRAND_CONFIG_DIR", config_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let output = strand()
        .args(["profile", "list", "--json"])
        .env("STRAND_CONFIG_DIR", config_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["profiles"][0]["name"], "test-profile");
    // Credentials never appear in listing output
    assert!(!String::from_utf8_lossy(&output.stdout).contains("secretkey"));

    let output = strand()
        .args(["profile", "remove", "test-profile"])
        .env("STRAND_CONFIG_DIR", config_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = strand()
        .args(["profile", "remove", "test-profile"])
        .env("STRAND_CONFIG_DIR", config_dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}
