//! Integration tests for the `utilitool` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn utilitool(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_utilitool"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run utilitool")
}

fn sample_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "package.json", r#"{ "name": "utils", "version": "1.0.0", "license": "MIT" }"#);
    write(root, "tsconfig.json", r#"{ "compilerOptions": { "strict": true } }"#);
    write(root, "doit.ts", "export const doit = () => 1;\n");
    write(root, "dothat.ts", "import { doit } from './doit';\nexport const dothat = doit;\n");
    temp
}

// ────────────────────────────────────────────────────────────────────────────
// Successful runs
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_splits_project() {
    let temp = sample_project();
    let project = temp.path().to_str().unwrap();

    let output = utilitool(&["-p", project, "--no-build"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("utils-doit"));
    assert!(stdout.contains("utils-dothat"));
    assert!(stdout.contains("2 packages written to"));

    let rewritten =
        fs::read_to_string(temp.path().join("utilitool-packages/utils-dothat/dothat.ts")).unwrap();
    assert_eq!(rewritten, "import { doit } from 'utils-doit';\nexport const dothat = doit;\n");
}

#[test]
fn test_custom_out_dir_and_version() {
    let temp = sample_project();
    let project = temp.path().to_str().unwrap();

    let output = utilitool(&[
        "--project",
        project,
        "--out-dir",
        "dist-packages",
        "--no-build",
        "--set-version",
        "2.0.0",
        "--quiet",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let manifest =
        fs::read_to_string(temp.path().join("dist-packages/utils-dothat/package.json")).unwrap();
    assert!(manifest.contains("\"utils-doit\": \"2.0.0\""));
    assert!(manifest.contains("\"version\": \"2.0.0\""));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("utilitool v"));
}

#[test]
fn test_log_level_controls_output() {
    let temp = sample_project();
    let project = temp.path().to_str().unwrap();

    let verbose = utilitool(&["-p", project, "--no-build"]);
    assert!(String::from_utf8_lossy(&verbose.stderr).contains("writing shared tsconfig.json"));

    let silent = utilitool(&["-p", project, "--no-build", "--log-level", "silent"]);
    assert!(silent.status.success());
    assert!(silent.stdout.is_empty());
    assert!(silent.stderr.is_empty());
}

// ────────────────────────────────────────────────────────────────────────────
// Failures
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unresolved_import_exits_nonzero() {
    let temp = sample_project();
    write(temp.path(), "broken.ts", "import './missing';\n");
    let project = temp.path().to_str().unwrap();

    let output = utilitool(&["-p", project, "--no-build"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to resolve request \"./missing\""));
}

#[test]
fn test_missing_configuration() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "package.json", r#"{ "name": "utils" }"#);
    let project = temp.path().to_str().unwrap();

    let output = utilitool(&["-p", project, "--no-build"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unable to find tsconfig.json"));
}

#[cfg(unix)]
#[test]
fn test_build_failure_propagates_exit_code() {
    let temp = sample_project();
    let project = temp.path().to_str().unwrap();

    let output = utilitool(&["-p", project, "--build-command", "false"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Build command `false` failed"));
    // Everything is emitted before the build runs
    assert!(temp.path().join("utilitool-packages/tsconfig.json").exists());
}

#[test]
fn test_invalid_arguments() {
    let output = utilitool(&["--bump", "sideways"]);
    assert_eq!(output.status.code(), Some(2));
}
