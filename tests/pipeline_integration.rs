//! End-to-end pipeline runs against scripted external tools
//!
//! The checker flags trailing blanks and `int x;`; the formatter scripts
//! stand in for clang-format in its healthy, slow and outdated states.

#![cfg(unix)]

use normfix::config::FixerConfig;
use normfix::pipeline::{PipelineOptions, RepairPipeline, ReportStatus, Stage};
use pretty_assertions::assert_eq;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CHECKER: &str = r#"#!/bin/sh
status=0
echo "$1: Error!"
if grep -q ' $' "$1"; then
    printf 'Error: SPC_BEFORE_NL        (line:   1, col:   7):\tSpace before newline\n'
    status=1
fi
if grep -q 'int x;' "$1"; then
    printf 'Error: SPACE_REPLACE_TAB    (line:   1, col:   4):\tFound space when expecting tab\n'
    status=1
fi
if grep -q 'TOO_MANY' "$1"; then
    printf 'Error: TOO_MANY_FUNCS       (line:   1, col:   1):\tToo many functions in file\n'
    status=1
fi
exit $status
"#;

/// Strips trailing blanks, like a formatter would.
const FORMATTER: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "Ubuntu clang-format version 15.0.7"
    exit 0
fi
sed 's/[ \t]*$//'
"#;

const SLOW_FORMATTER: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "clang-format version 15.0.7"
    exit 0
fi
exec sleep 5
"#;

const OLD_FORMATTER: &str = r#"#!/bin/sh
echo "clang-format version 6.0.0"
"#;

fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn setup(formatter: &str) -> (TempDir, FixerConfig) {
    let dir = TempDir::new().unwrap();
    let mut config = FixerConfig::default();
    config.checker.command = vec![script(dir.path(), "checker", CHECKER)];
    config.formatter.command = script(dir.path(), "formatter", formatter);
    config.formatter.timeout_secs = 1;
    (dir, config)
}

fn source(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("main.c");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_external_formatter_then_token_repair() {
    let (dir, config) = setup(FORMATTER);
    let file = source(dir.path(), "int x; \n");
    let pipeline = RepairPipeline::from_config(&config, PipelineOptions::default()).unwrap();

    let report = pipeline.repair(&file);

    assert_eq!(fs::read_to_string(&file).unwrap(), "int\tx;\n");
    assert_eq!(report.status(), ReportStatus::Ok);
    assert_eq!(report.before.len(), 2);
    assert!(report.notes.is_empty(), "{:?}", report.notes);

    let reformat = &report.stages[1];
    assert_eq!(reformat.stage, Stage::Reformat);
    assert!(reformat.changed);
    assert!(reformat.reason.ends_with("formatter"), "{}", reformat.reason);
    assert_eq!(report.fixes.len(), 1);
}

#[test]
fn test_slow_formatter_falls_back() {
    let (dir, config) = setup(SLOW_FORMATTER);
    let file = source(dir.path(), "int x;   \n");
    let pipeline = RepairPipeline::from_config(&config, PipelineOptions::default()).unwrap();

    let report = pipeline.repair(&file);

    assert_eq!(fs::read_to_string(&file).unwrap(), "int\tx;\n");
    assert_eq!(report.status(), ReportStatus::Ok);
    assert!(report.stages[1].reason.contains("builtin-normalizer"));
    assert!(report.notes.iter().any(|n| n.contains("did not finish")));
}

#[test]
fn test_outdated_formatter_is_never_used() {
    let (dir, config) = setup(OLD_FORMATTER);
    let file = source(dir.path(), "int x;  \n");
    let pipeline = RepairPipeline::from_config(&config, PipelineOptions::default()).unwrap();

    let report = pipeline.repair(&file);

    assert_eq!(report.stages[1].reason, "reformatted with builtin-normalizer");
    assert_eq!(fs::read_to_string(&file).unwrap(), "int\tx;\n");
}

#[test]
fn test_unclaimed_code_survives() {
    let (dir, mut config) = setup(FORMATTER);
    config.formatter.enabled = false;
    let file = source(dir.path(), "int x; /* TOO_MANY */\n");
    let pipeline = RepairPipeline::from_config(&config, PipelineOptions::default()).unwrap();

    let report = pipeline.repair(&file);

    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "int\tx; /* TOO_MANY */\n"
    );
    assert_eq!(report.status(), ReportStatus::Error);
    let remaining: Vec<_> = report.after.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(remaining, vec!["TOO_MANY_FUNCS"]);
}

#[test]
fn test_missing_checker_is_a_note_not_a_crash() {
    let (dir, mut config) = setup(FORMATTER);
    config.checker.command = vec!["normfix-no-such-checker".into()];
    let file = source(dir.path(), "int x;\n");
    let pipeline = RepairPipeline::from_config(&config, PipelineOptions::default()).unwrap();

    let reports = pipeline.repair_all(&[file.clone(), file.clone()], 2).unwrap();

    assert_eq!(reports.len(), 2);
    for report in reports {
        assert!(report.aborted);
        assert!(report.notes[0].contains("normfix-no-such-checker"));
    }
    assert_eq!(fs::read_to_string(&file).unwrap(), "int x;\n");
}
