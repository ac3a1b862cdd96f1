//! The `gradescan validate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradescan_core::parser;

pub fn execute(rubrics_path: PathBuf) -> Result<()> {
    let rubrics = parser::load_rubrics(&rubrics_path)?;

    println!("Rubric set: {} rubric(s)", rubrics.len());
    for rubric in &rubrics {
        println!(
            "  Q{}: {} marks across {} scoring point(s)",
            rubric.question_number,
            rubric.max_marks,
            rubric.marking_scheme.len()
        );
    }

    match parser::validate_rubrics(&rubrics) {
        Ok(()) => {
            println!("All rubrics valid.");
            Ok(())
        }
        Err(e) => {
            for message in &e.messages {
                println!("  VIOLATION: {message}");
            }
            anyhow::bail!("{} violation(s) found", e.messages.len());
        }
    }
}
