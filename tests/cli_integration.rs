//! Integration tests for the command-line interface
//!
//! Drives the built binary against a shell-script stand-in for the checker
//! that flags `int x;` on line 1 and passes everything else.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const FAKE_CHECKER: &str = r#"#!/bin/sh
if grep -q 'int x;' "$1"; then
    echo "$1: Error!"
    printf 'Error: SPACE_REPLACE_TAB    (line:   1, col:   4):\tFound space when expecting tab\n'
    exit 1
fi
echo "$1: OK!"
"#;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        Self::with_rules("")
    }

    fn with_rules(rules: &str) -> Self {
        let dir = TempDir::new().unwrap();

        let checker = dir.path().join("fake-norminette");
        fs::write(&checker, FAKE_CHECKER).unwrap();
        fs::set_permissions(&checker, fs::Permissions::from_mode(0o755)).unwrap();

        let config = dir.path().join("normfix.toml");
        fs::write(
            &config,
            format!(
                "[checker]\ncommand = [\"{}\"]\ntimeout_secs = 10\n\n[formatter]\nenabled = false\n\n{rules}",
                checker.display()
            ),
        )
        .unwrap();

        fs::create_dir(dir.path().join("src")).unwrap();
        Self { dir, config }
    }

    fn source(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join("src").join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn src(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_normfix"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_normfix"))
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("check"));
    assert!(text.contains("fix"));
    assert!(text.contains("rules"));
}

#[test]
fn test_fix_help_marks_no_reformat_as_opt_out() {
    let output = Command::new(env!("CARGO_BIN_EXE_normfix"))
        .args(["fix", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("--no-reformat"));
    assert!(text.contains("otherwise always runs"));
}

#[test]
fn test_check_reports_and_fails() {
    let ws = Workspace::new();
    ws.source("a.c", "int x;\n");

    let output = ws.run(&["check", arg(&ws.src())]);

    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("SPACE_REPLACE_TAB"));
    assert!(text.contains("1:4"));
}

#[test]
fn test_check_clean_tree_succeeds() {
    let ws = Workspace::new();
    ws.source("a.c", "int\tx;\n");

    let output = ws.run(&["check", arg(&ws.src())]);
    assert!(output.status.success(), "{}", stdout(&output));
}

#[test]
fn test_check_json() {
    let ws = Workspace::new();
    ws.source("a.c", "int x;\n");

    let output = ws.run(&["check", "--json", arg(&ws.src())]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(value[0]["diagnostics"][0]["code"], "SPACE_REPLACE_TAB");
    assert_eq!(value[0]["diagnostics"][0]["line"], 1);
}

#[test]
fn test_fix_repairs_files() {
    let ws = Workspace::new();
    let file = ws.source("a.c", "int x;\n");
    let clean = ws.source("b.h", "int\ty;\n");

    let output = ws.run(&["fix", arg(&ws.src())]);

    assert!(output.status.success(), "{}", stdout(&output));
    assert_eq!(fs::read_to_string(&file).unwrap(), "int\tx;\n");
    assert_eq!(fs::read_to_string(&clean).unwrap(), "int\ty;\n");
    let text = stdout(&output);
    assert!(text.contains("1 -> 0 diagnostics"));
    assert!(text.contains("space-instead-of-tab"));
}

#[test]
fn test_fix_dry_run_with_diff() {
    let ws = Workspace::new();
    let file = ws.source("a.c", "int x;\n");

    let output = ws.run(&["fix", "--dry-run", "--diff", arg(&file)]);

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&file).unwrap(), "int x;\n");
    let text = stdout(&output);
    assert!(text.contains("DRY RUN"));
    assert!(text.contains("-int x;"));
    assert!(text.contains("+int\tx;"));
}

#[test]
fn test_fix_json_report() {
    let ws = Workspace::new();
    ws.source("a.c", "int x;\n");

    let output = ws.run(&["fix", "--json", "--jobs", "2", arg(&ws.src())]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    let report = &value[0];
    assert_eq!(report["status"], "ok");
    assert_eq!(report["before"].as_array().unwrap().len(), 1);
    assert_eq!(report["after"].as_array().unwrap().len(), 0);
    assert_eq!(report["fixes"][0]["rule"], "space-instead-of-tab");
    assert_eq!(report["stages"][2]["stage"], "token_repair");
}

#[test]
fn test_fix_with_disabled_rule_leaves_error() {
    let ws = Workspace::with_rules("[rules]\ndisabled = [\"SPACE_REPLACE_TAB\"]\n");
    let file = ws.source("a.c", "int x;\n");

    let output = ws.run(&["fix", arg(&ws.src())]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(fs::read_to_string(&file).unwrap(), "int x;\n");
}

#[test]
fn test_rules_listing_marks_disabled() {
    let ws = Workspace::with_rules("[rules]\ndisabled = [\"consecutive-spaces\"]\n");

    let output = ws.run(&["rules"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("trailing-whitespace"));
    assert!(text.contains("consecutive-spaces (disabled)"));
    assert!(text.find("trailing-whitespace") < text.find("space-after-keyword"));
}

#[test]
fn test_invalid_config_is_reported() {
    let ws = Workspace::with_rules("[rules]\ndisabled = [\"consecutive-space\"]\n");

    let output = ws.run(&["rules"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did you mean 'consecutive-spaces'"));
}

#[test]
fn test_empty_tree_is_an_error() {
    let ws = Workspace::new();
    let output = ws.run(&["fix", arg(&ws.src())]);
    assert!(!output.status.success());
}
