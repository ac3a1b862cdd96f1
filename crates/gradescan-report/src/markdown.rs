//! Markdown feedback report.
//!
//! Renders a finished sheet analysis as one self-contained markdown document:
//! overall feedback, a verdict table per question, sheet-wide suggestions,
//! and the raw result JSON in a collapsed appendix.

use std::path::Path;

use anyhow::Result;

use gradescan_core::feedback::DetailedFeedback;
use gradescan_core::results::SheetResult;

/// Escape a string for safe use inside a markdown table cell.
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// Generate a markdown report from a sheet result and its feedback bundle.
pub fn generate_markdown(sheet: &SheetResult, feedback: &DetailedFeedback) -> String {
    let mut md = String::new();

    md.push_str(&format!("# gradescan report — sheet {}\n\n", sheet.sheet_id));
    if let Some(student) = &sheet.student_id {
        md.push_str(&format!("Student: **{student}**\n\n"));
    }
    md.push_str(&format!(
        "Analyzed {} | {} of {} questions | {:.1}% | confidence: {}\n\n",
        sheet.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        sheet.analyzed_questions,
        sheet.total_questions,
        sheet.percentage_score,
        feedback.confidence_assessment.reliability
    ));

    // Overall
    md.push_str("## Overall\n\n");
    md.push_str(&feedback.overall_performance);
    md.push_str("\n\n");
    md.push_str(&format!("> {}\n\n", feedback.confidence_assessment.note));
    md.push_str(&format!(
        "- Marks: {:.1} of {:.1}\n- Analysis time: {} ms\n\n",
        sheet.overall_score * sheet.total_possible_marks,
        sheet.total_possible_marks,
        sheet.analysis_time_ms
    ));

    // Per-question sections
    if !sheet.question_results.is_empty() {
        md.push_str("## Questions\n\n");
    }
    for question in &sheet.question_results {
        let entry = feedback
            .question_feedback
            .iter()
            .find(|f| f.question_number == question.question_number);

        md.push_str(&format!(
            "### Question {} — {:.1}/{} ({:.1}%)\n\n",
            question.question_number,
            question.effective_marks(),
            question.max_marks,
            question.percentage()
        ));
        if let Some(entry) = entry {
            md.push_str(&entry.feedback);
            md.push_str("\n\n");
        }
        if !question.summary.is_empty() {
            md.push_str(&format!("_{}_\n\n", question.summary));
        }

        if !question.verdicts.is_empty() {
            md.push_str("| Scoring point | Verdict | Confidence | Marks |\n");
            md.push_str("|---|---|---|---|\n");
            for verdict in &question.verdicts {
                md.push_str(&format!(
                    "| {} | {} | {:.2} | {:.1}/{:.1} |\n",
                    escape_cell(&verdict.rubric_point),
                    verdict.status,
                    verdict.confidence,
                    verdict.marks_awarded,
                    verdict.total_marks
                ));
            }
            md.push('\n');
        }
        if question.missed_marks_potential > 0.0 {
            md.push_str(&format!(
                "Up to {:.1} marks were not deducted because the verdicts claiming them were too uncertain.\n\n",
                question.missed_marks_potential
            ));
        }
        if let Some(entry) = entry {
            if !entry.suggestions.is_empty() {
                md.push_str("Suggestions:\n\n");
                for suggestion in &entry.suggestions {
                    md.push_str(&format!("- {suggestion}\n"));
                }
                md.push('\n');
            }
        }
    }

    // Sheet-wide feedback
    if !feedback.strengths.is_empty() {
        md.push_str("## Strengths\n\n");
        for strength in &feedback.strengths {
            md.push_str(&format!("- {strength}\n"));
        }
        md.push('\n');
    }
    if !feedback.areas_for_improvement.is_empty() {
        md.push_str("## Areas for improvement\n\n");
        for area in &feedback.areas_for_improvement {
            md.push_str(&format!("- {area}\n"));
        }
        md.push('\n');
    }
    if !feedback.improvement_suggestions.is_empty() {
        md.push_str("## Improvement suggestions\n\n");
        for suggestion in &feedback.improvement_suggestions {
            md.push_str(&format!("- {suggestion}\n"));
        }
        md.push('\n');
    }

    // Diagnostics from segmentation and skipped questions
    let mut diagnostics: Vec<&str> = Vec::new();
    if let Some(sequence) = &sheet.metadata.sequence {
        diagnostics.extend(sequence.issues.iter().map(String::as_str));
    }
    diagnostics.extend(sheet.metadata.skipped.iter().map(String::as_str));
    if !diagnostics.is_empty() {
        md.push_str("## Diagnostics\n\n");
        for diagnostic in &diagnostics {
            md.push_str(&format!("- {diagnostic}\n"));
        }
        md.push('\n');
    }

    if !sheet.processing_errors.is_empty() {
        md.push_str("## Processing errors\n\n");
        for error in &sheet.processing_errors {
            md.push_str(&format!("- {error}\n"));
        }
        md.push('\n');
    }

    // Raw JSON appendix
    md.push_str("<details>\n<summary>Raw JSON data</summary>\n\n");
    md.push_str("```json\n");
    md.push_str(&serde_json::to_string_pretty(sheet).unwrap_or_default());
    md.push_str("\n```\n\n</details>\n");

    md
}

/// Write a markdown report to a file.
pub fn write_markdown_report(
    sheet: &SheetResult,
    feedback: &DetailedFeedback,
    path: &Path,
) -> Result<()> {
    let md = generate_markdown(sheet, feedback);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, md)?;
    Ok(())
}
