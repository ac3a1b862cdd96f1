//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gradescan() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("gradescan").unwrap()
}

/// Write a valid one-question rubric file and return its path.
fn write_rubrics(dir: &Path) -> PathBuf {
    let path = dir.join("rubrics.json");
    std::fs::write(&path, VALID_RUBRICS).unwrap();
    path
}

#[test]
fn validate_valid_rubrics() {
    let dir = TempDir::new().unwrap();
    let rubrics = write_rubrics(dir.path());

    gradescan()
        .arg("validate")
        .arg("--rubrics")
        .arg(&rubrics)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 rubric(s)"))
        .stdout(predicate::str::contains("All rubrics valid"));
}

#[test]
fn validate_toml_rubrics() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rubrics.toml");
    std::fs::write(&path, VALID_TOML_RUBRICS).unwrap();

    gradescan()
        .arg("validate")
        .arg("--rubrics")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Q2: 4 marks"))
        .stdout(predicate::str::contains("All rubrics valid"));
}

#[test]
fn validate_rejects_mismatched_marks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, MISMATCHED_RUBRICS).unwrap();

    gradescan()
        .arg("validate")
        .arg("--rubrics")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("VIOLATION"))
        .stderr(predicate::str::contains("violation(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    gradescan()
        .arg("validate")
        .arg("--rubrics")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn validate_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rubrics.yaml");
    std::fs::write(&path, "rubrics: []").unwrap();

    gradescan()
        .arg("validate")
        .arg("--rubrics")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported rubric format"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    gradescan()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created gradescan.toml"))
        .stdout(predicate::str::contains("Created rubrics/example.json"));

    assert!(dir.path().join("gradescan.toml").exists());
    assert!(dir.path().join("rubrics/example.json").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    // First init
    gradescan()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    // Second init should skip
    gradescan()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_output_passes_validation() {
    let dir = TempDir::new().unwrap();

    gradescan()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    gradescan()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--rubrics")
        .arg("rubrics/example.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("All rubrics valid"));
}

#[test]
fn analyze_missing_image() {
    let dir = TempDir::new().unwrap();
    let rubrics = write_rubrics(dir.path());

    gradescan()
        .current_dir(dir.path())
        .arg("analyze")
        .arg("--image")
        .arg("no-such-scan.png")
        .arg("--rubrics")
        .arg(&rubrics)
        .assert()
        .failure()
        .stderr(predicate::str::contains("image not found"));
}

#[test]
fn analyze_unreadable_image_reports_the_failure() {
    let dir = TempDir::new().unwrap();
    let rubrics = write_rubrics(dir.path());
    std::fs::write(dir.path().join("scan.png"), b"not actually a png").unwrap();

    // Extraction failures land in the result instead of aborting the run,
    // so the command still succeeds and saves a result file.
    gradescan()
        .current_dir(dir.path())
        .arg("analyze")
        .arg("--image")
        .arg("scan.png")
        .arg("--rubrics")
        .arg(&rubrics)
        .arg("--output")
        .arg("out")
        .assert()
        .success()
        .stderr(predicate::str::contains("extraction"));

    let saved = std::fs::read_dir(dir.path().join("out")).unwrap().count();
    assert!(saved >= 1, "expected at least one saved result file");
}

#[test]
fn analyze_requires_an_image_argument() {
    gradescan()
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--image"));
}

#[test]
fn batch_rejects_a_directory_without_images() {
    let dir = TempDir::new().unwrap();
    let rubrics = write_rubrics(dir.path());
    std::fs::create_dir(dir.path().join("scans")).unwrap();

    gradescan()
        .current_dir(dir.path())
        .arg("batch")
        .arg("--directory")
        .arg("scans")
        .arg("--rubrics")
        .arg(&rubrics)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no sheet images found"));
}

#[test]
fn help_output() {
    gradescan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Answer-sheet OCR and rubric scoring"));
}

#[test]
fn version_output() {
    gradescan()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gradescan"));
}

const VALID_RUBRICS: &str = r#"[
  {
    "question_number": 1,
    "max_marks": 8.0,
    "marking_scheme": {
      "method_identification": {
        "description": "Identifies factoring as the method",
        "marks": 2.0,
        "keywords": ["factoring"]
      },
      "correct_factoring": {
        "description": "Factors the quadratic correctly",
        "marks": 3.0,
        "keywords": ["(x+2)(x+3)"]
      },
      "final_solution": {
        "description": "States both roots",
        "marks": 2.0,
        "keywords": ["x = -2", "x = -3"]
      },
      "verification": {
        "description": "Verifies the roots",
        "marks": 1.0,
        "keywords": ["check"]
      }
    }
  }
]"#;

const VALID_TOML_RUBRICS: &str = r#"
[[rubrics]]
question_number = 2
max_marks = 4.0
keywords = ["photosynthesis"]

[rubrics.marking_scheme.definition]
description = "Defines photosynthesis"
marks = 2.0
keywords = ["light", "chlorophyll"]

[rubrics.marking_scheme.equation]
description = "Writes the balanced equation"
marks = 2.0
"#;

// Scheme sums to 5 against a 10-mark maximum.
const MISMATCHED_RUBRICS: &str = r#"[
  {
    "question_number": 1,
    "max_marks": 10.0,
    "marking_scheme": {
      "only_point": {
        "description": "Half the marks are unaccounted for",
        "marks": 5.0
      }
    }
  }
]"#;
