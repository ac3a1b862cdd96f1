//! The `gradescan init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create gradescan.toml
    if std::path::Path::new("gradescan.toml").exists() {
        println!("gradescan.toml already exists, skipping.");
    } else {
        std::fs::write("gradescan.toml", SAMPLE_CONFIG)?;
        println!("Created gradescan.toml");
    }

    // Create example rubric
    std::fs::create_dir_all("rubrics")?;
    let example_path = std::path::Path::new("rubrics/example.json");
    if example_path.exists() {
        println!("rubrics/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_RUBRICS)?;
        println!("Created rubrics/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit gradescan.toml for your inference service (or set enable_ai_analysis = false)");
    println!("  2. Run: gradescan validate --rubrics rubrics/example.json");
    println!("  3. Run: gradescan analyze --image sheet.png --rubrics rubrics/example.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradescan configuration

results_dir = "./gradescan-results"

[matcher]
kind = "semantic"
endpoint = "http://localhost:11434"
model = "llama3.1:8b"
api_key = "${GRADESCAN_API_KEY}"
timeout_secs = 30

[analysis]
confidence_threshold = 0.7
min_text_length = 10
max_questions_per_sheet = 20
enable_ai_analysis = true
save_intermediate_results = true
fallback_on_error = false
pacing_delay_ms = 100
"#;

const EXAMPLE_RUBRICS: &str = r#"[
  {
    "question_number": 1,
    "question_text": "Solve x^2 + 5x + 6 = 0",
    "max_marks": 8.0,
    "model_answer": "Factor as (x+2)(x+3) = 0, so x = -2 or x = -3. Check both by substitution.",
    "marking_scheme": {
      "method_identification": {
        "description": "Identifies factoring or the quadratic formula as the method",
        "marks": 2.0,
        "keywords": ["factoring", "quadratic formula", "complete square"]
      },
      "correct_factoring": {
        "description": "Factors the quadratic correctly",
        "marks": 3.0,
        "keywords": ["(x+2)(x+3)", "factors"]
      },
      "final_solution": {
        "description": "States both roots",
        "marks": 2.0,
        "keywords": ["x = -2", "x = -3"]
      },
      "verification": {
        "description": "Verifies the roots by substitution",
        "marks": 1.0,
        "keywords": ["check", "verify", "substitute"]
      }
    },
    "keywords": ["quadratic", "factoring"]
  }
]
"#;
