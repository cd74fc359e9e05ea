//! CLI end-to-end tests.
//!
//! These tests spawn the actual `presso` binary in a temporary project and
//! validate stdout, exit codes and the files left on disk.
//!
//! Exit code expectations:
//! - 0: Success
//! - 2: Invalid arguments (bad identifier, bad plan file)
//! - 3: Resolution error (no symbol, collision)
//! - 4: Apply error (stale plan)

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run presso in `dir` and return (stdout JSON text, exit code).
fn run_presso(dir: &Path, args: &[&str]) -> (String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_presso"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute presso");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    (stdout, output.status.code().unwrap_or(-1))
}

fn json(stdout: &str) -> Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

const FOO: &str = "class Foo { void bar() { int x = 1; return x; } }\n";

// ============================================================================
// Queries
// ============================================================================

mod queries {
    use super::*;

    #[test]
    fn locate_reports_the_symbol() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &["locate", "--file", "Foo.java", "--line", "1", "--col", "44"],
        );
        assert_eq!(code, 0);
        let response = json(&stdout);
        assert_eq!(response["status"], "ok");
        assert_eq!(response["schema_version"], "1");
        assert_eq!(response["symbol"]["name"], "x");
        assert_eq!(response["symbol"]["kind"], "local_variable");
        assert_eq!(response["symbol"]["location"]["col"], 30);
        assert_eq!(response["occurrences"], 2);
    }

    #[test]
    fn references_are_in_source_order() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &["references", "--file", "Foo.java", "--line", "1", "--col", "30"],
        );
        assert_eq!(code, 0);
        let refs = json(&stdout)["references"].as_array().unwrap().clone();
        let cols: Vec<u64> = refs
            .iter()
            .map(|r| r["location"]["col"].as_u64().unwrap())
            .collect();
        assert_eq!(cols, vec![30, 44]);
        assert_eq!(refs[0]["kind"], "declaration");
        assert_eq!(refs[1]["kind"], "reference");
    }

    #[test]
    fn whitespace_is_a_resolution_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &["locate", "--file", "Foo.java", "--line", "1", "--col", "12"],
        );
        assert_eq!(code, 3);
        let response = json(&stdout);
        assert_eq!(response["status"], "error");
        assert_eq!(response["error"]["code"], 3);
        assert_eq!(response["error"]["location"]["line"], 1);
    }

    #[test]
    fn enclosing_method() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "enclosing", "--file", "Foo.java", "--line", "1", "--col", "44", "--kind",
                "method",
            ],
        );
        assert_eq!(code, 0);
        let response = json(&stdout);
        assert_eq!(response["declaration"]["name"], "bar");
        assert_eq!(response["declaration"]["node_kind"], "method_declaration");
    }

    #[test]
    fn missing_file() {
        let temp = TempDir::new().unwrap();
        let (stdout, code) = run_presso(
            temp.path(),
            &["locate", "--file", "Nope.java", "--line", "1", "--col", "1"],
        );
        assert_eq!(code, 3);
        assert_eq!(json(&stdout)["status"], "error");
    }
}

// ============================================================================
// Rename and Apply
// ============================================================================

mod rename {
    use super::*;

    #[test]
    fn preview_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "rename", "--file", "Foo.java", "--line", "1", "--col", "30", "--to", "count",
            ],
        );
        assert_eq!(code, 0);
        let response = json(&stdout);
        assert_eq!(response["applied"], false);
        assert_eq!(response["summary"]["edits_count"], 2);
        assert_eq!(response["plan"]["valid"], true);
        assert_eq!(response["patch"]["edits"][0]["old_text"], "x");
        assert_eq!(fs::read_to_string(file).unwrap(), FOO);
    }

    #[test]
    fn apply_writes_file() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "rename", "--file", "Foo.java", "--line", "1", "--col", "30", "--to", "count",
                "--apply",
            ],
        );
        assert_eq!(code, 0, "stdout: {stdout}");
        assert_eq!(json(&stdout)["applied"], true);
        assert_eq!(
            fs::read_to_string(file).unwrap(),
            "class Foo { void bar() { int count = 1; return count; } }\n"
        );
    }

    #[test]
    fn type_rename_suggests_file_move() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Foo.java", "class Foo { Foo() {} }\n");

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "rename", "--file", "Foo.java", "--line", "1", "--col", "7", "--to", "Baz",
            ],
        );
        assert_eq!(code, 0);
        let response = json(&stdout);
        assert_eq!(response["summary"]["edits_count"], 2);
        assert_eq!(response["file_rename"]["to"], "Baz.java");
    }

    #[test]
    fn text_format_prints_diff() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "--format", "text", "rename", "--file", "Foo.java", "--line", "1", "--col",
                "30", "--to", "count",
            ],
        );
        assert_eq!(code, 0);
        assert!(stdout.starts_with("--- a/Foo.java\n+++ b/Foo.java\n"));
        assert!(stdout.contains("+class Foo { void bar() { int count = 1; return count; } }"));
    }

    #[test]
    fn keyword_is_invalid_arguments() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "Foo.java", FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "rename", "--file", "Foo.java", "--line", "1", "--col", "30", "--to", "class",
                "--apply",
            ],
        );
        assert_eq!(code, 2);
        assert_eq!(json(&stdout)["error"]["code"], 2);
        assert_eq!(fs::read_to_string(file).unwrap(), FOO);
    }

    #[test]
    fn collision_is_rejected_without_writing() {
        let temp = TempDir::new().unwrap();
        let source = "class C {\n    int total;\n    void m() {\n        int sum = 0;\n        sum += total;\n    }\n}\n";
        let file = write(temp.path(), "C.java", source);

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "rename", "--file", "C.java", "--line", "2", "--col", "9", "--to", "sum",
                "--apply",
            ],
        );
        assert_eq!(code, 3);
        let response = json(&stdout);
        assert_eq!(response["error"]["location"]["line"], 4);
        assert_eq!(fs::read_to_string(file).unwrap(), source);
    }

    #[test]
    fn plan_round_trip_through_apply_plan() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "Foo.java", FOO);

        let (_, code) = run_presso(
            temp.path(),
            &[
                "rename", "--file", "Foo.java", "--line", "1", "--col", "30", "--to", "count",
                "--plan-out", "plan.json",
            ],
        );
        assert_eq!(code, 0);
        assert!(temp.path().join("plan.json").is_file());
        assert_eq!(fs::read_to_string(&file).unwrap(), FOO);

        let (stdout, code) = run_presso(
            temp.path(),
            &["apply-plan", "--file", "Foo.java", "--plan", "plan.json"],
        );
        assert_eq!(code, 0, "stdout: {stdout}");
        assert_eq!(json(&stdout)["applied"], true);
        assert!(fs::read_to_string(&file).unwrap().contains("return count;"));
    }

    #[test]
    fn stale_plan_is_an_apply_error() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "Foo.java", FOO);

        let (_, code) = run_presso(
            temp.path(),
            &[
                "rename", "--file", "Foo.java", "--line", "1", "--col", "30", "--to", "count",
                "--plan-out", "plan.json",
            ],
        );
        assert_eq!(code, 0);

        let edited = format!("// edited\n{}", FOO);
        fs::write(&file, &edited).unwrap();

        let (stdout, code) = run_presso(
            temp.path(),
            &["apply-plan", "--file", "Foo.java", "--plan", "plan.json"],
        );
        assert_eq!(code, 4);
        assert_eq!(json(&stdout)["status"], "error");
        assert_eq!(fs::read_to_string(&file).unwrap(), edited);
    }

    #[test]
    fn garbage_plan_is_invalid_arguments() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Foo.java", FOO);
        write(temp.path(), "plan.json", "{ not json");

        let (_, code) = run_presso(
            temp.path(),
            &["apply-plan", "--file", "Foo.java", "--plan", "plan.json"],
        );
        assert_eq!(code, 2);
    }
}

// ============================================================================
// Project Commands
// ============================================================================

mod project {
    use super::*;

    const APP: &str = "package com.acme;\n\npublic class App {\n    public static void main(String[] args) {}\n}\n";

    #[test]
    fn check_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/main/java/com/acme/App.java", APP);
        write(temp.path(), "src/main/java/com/acme/Broken.java", "class Broken { void m( }\n");

        let (stdout, code) = run_presso(temp.path(), &["check", "--cwd", "."]);
        assert_eq!(code, 0);
        let response = json(&stdout);
        assert_eq!(response["files"].as_array().unwrap().len(), 2);
        assert_eq!(response["files_with_errors"], 1);
    }

    #[test]
    fn main_class_and_package() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/main/java/com/acme/App.java", APP);

        let (stdout, code) = run_presso(temp.path(), &["get-main-class", "--cwd", "."]);
        assert_eq!(code, 0);
        let response = json(&stdout);
        assert_eq!(response["package_name"], "com.acme");
        assert!(response["file_path"]
            .as_str()
            .unwrap()
            .ends_with("App.java"));
    }

    #[test]
    fn create_new_file_writes_template() {
        let temp = TempDir::new().unwrap();

        let (stdout, code) = run_presso(
            temp.path(),
            &[
                "create-new-file",
                "--cwd",
                ".",
                "--package-name",
                "com.acme.model",
                "--file-name",
                "Order",
                "--file-type",
                "interface",
            ],
        );
        assert_eq!(code, 0, "stdout: {stdout}");
        let path = temp.path().join("src/main/java/com/acme/model/Order.java");
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("package com.acme.model;"));
        assert!(contents.contains("public interface Order"));

        // A second run refuses to overwrite.
        let (_, code) = run_presso(
            temp.path(),
            &[
                "create-new-file",
                "--cwd",
                ".",
                "--package-name",
                "com.acme.model",
                "--file-name",
                "Order",
                "--file-type",
                "class",
            ],
        );
        assert_eq!(code, 2);
    }
}
