//! Runs the srcpkg binary against the fixture package.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn write_settings(workspace: &Path) -> PathBuf {
    let path = workspace.join("settings.toml");
    let toml = format!(
        "[context]\ngoroot = \"{}\"\ngopath = [\"{}\"]\ngoos = \"linux\"\ngoarch = \"amd64\"\n",
        fixtures().join("goroot").display(),
        fixtures().join("gopath").display(),
    );
    std::fs::write(&path, toml).expect("write settings file");
    path
}

fn run_cli(args: &[&str]) -> Output {
    let workspace = TempDir::new().expect("create temp dir");
    let settings = write_settings(workspace.path());
    Command::new(env!("CARGO_BIN_EXE_srcpkg"))
        .args(args)
        .arg("--config")
        .arg(&settings)
        .current_dir(workspace.path())
        .env_remove("SRCPKG_VERBOSE")
        .output()
        .expect("run srcpkg CLI")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "srcpkg failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_synopsis_view() {
    let out = stdout(&run_cli(&["example.com/tpkg"]));
    assert_eq!(
        out.trim_end(),
        "srcpkg::Package{tpkg}: Package tpkg is used to exercise package introspection."
    );
}

#[test]
fn test_methods_view_as_json() {
    let out = stdout(&run_cli(&[
        "example.com/tpkg",
        "methods",
        "--type",
        "PublicStruct",
        "--json",
    ]));
    let parsed: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    let methods = parsed[0]["methods"].as_array().expect("methods array");
    assert_eq!(methods.len(), 6);
    assert_eq!(methods[0]["name"], "MethodOne");
}

#[test]
fn test_funcs_view() {
    let out = stdout(&run_cli(&["example.com/tpkg", "funcs"]));
    let names: Vec<&str> = out
        .lines()
        .filter_map(|line| line.strip_prefix("func "))
        .filter_map(|rest| rest.split('(').next())
        .collect();
    assert_eq!(
        names,
        vec!["FuncOne", "FuncThree", "FuncTwo", "NewPublicStruct", "Open"]
    );
}

#[test]
fn test_unknown_package_fails() {
    let output = run_cli(&["example.com/missing"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot find package \"example.com/missing\""));
}
