//! CSV per-question score export.
//!
//! One row per analyzed question, for spreadsheet import and cross-sheet
//! aggregation. Rendered by hand; quoting follows RFC 4180.

use std::path::Path;

use anyhow::Result;

use gradescan_core::results::{SheetResult, VerdictStatus};

/// Quote a CSV field when it contains a delimiter, doubling inner quotes.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Generate the CSV export for one sheet.
pub fn generate_csv(sheet: &SheetResult) -> String {
    let mut csv = String::new();
    csv.push_str(
        "sheet_id,question,marks,max_marks,percentage,confidence,yes,partial,no,missed_potential,summary\n",
    );

    for question in &sheet.question_results {
        let yes = count_status(question, VerdictStatus::Yes);
        let partial = count_status(question, VerdictStatus::Partial);
        let no = count_status(question, VerdictStatus::No);

        csv.push_str(&format!(
            "{},{},{:.2},{},{:.1},{:.2},{},{},{},{:.2},{}\n",
            csv_field(&sheet.sheet_id),
            question.question_number,
            question.effective_marks(),
            question.max_marks,
            question.percentage(),
            question.confidence_score,
            yes,
            partial,
            no,
            question.missed_marks_potential,
            csv_field(&question.summary),
        ));
    }

    csv
}

fn count_status(question: &gradescan_core::results::QuestionResult, status: VerdictStatus) -> usize {
    question.verdicts.iter().filter(|v| v.status == status).count()
}

/// Write the CSV export to a file.
pub fn write_csv_report(sheet: &SheetResult, path: &Path) -> Result<()> {
    let csv = generate_csv(sheet);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, csv)?;
    Ok(())
}
