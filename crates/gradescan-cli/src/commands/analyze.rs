//! The `gradescan analyze` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use gradescan_core::engine::{AnalysisEngine, AnalysisRequest, ProgressReporter};
use gradescan_core::feedback::detailed_feedback;
use gradescan_core::parser;
use gradescan_core::results::{QuestionResult, SheetResult};
use gradescan_core::store::JsonFileStore;
use gradescan_extract::TesseractExtractor;
use gradescan_matchers::config::{create_fallback, load_config_from};
use gradescan_matchers::{create_matcher, GradescanConfig};
use gradescan_report::{write_csv_report, write_markdown_report};

/// Console progress reporter.
pub(crate) struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_question_start(&self, question_number: u32) {
        eprintln!("  Analyzing question {question_number}...");
    }

    fn on_question_complete(&self, result: &QuestionResult) {
        eprintln!(
            "  Done: question {} scored {:.1}/{} at confidence {:.2} ({}ms)",
            result.question_number,
            result.effective_marks(),
            result.max_marks,
            result.confidence_score,
            result.processing_time_ms,
        );
    }

    fn on_question_error(&self, question_number: u32, error: &str) {
        eprintln!("  ERROR: question {question_number}: {error}");
    }

    fn on_sheet_complete(&self, result: &SheetResult) {
        eprintln!(
            "\nComplete: {}/{} questions analyzed, {:.1}% overall ({}ms)",
            result.analyzed_questions,
            result.total_questions,
            result.percentage_score,
            result.analysis_time_ms,
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    image: PathBuf,
    rubrics_path: PathBuf,
    student: Option<String>,
    sheet_id: Option<String>,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    // Validate inputs
    anyhow::ensure!(image.exists(), "image not found: {}", image.display());

    // Load config
    let config = load_config_from(config_path.as_deref())?;
    let output = output.unwrap_or_else(|| config.results_dir.clone());
    debug!(
        matcher = ?config.matcher,
        output = %output.display(),
        "configuration loaded"
    );

    // Load rubrics
    let rubrics = parser::load_rubrics(&rubrics_path)?;

    eprintln!(
        "gradescan v0.1.0: analyzing {} against {} rubric(s)",
        image.display(),
        rubrics.len()
    );
    eprintln!();

    let engine = build_engine(&config, &output)?;
    let reporter = ConsoleReporter;

    let mut request = AnalysisRequest::new(image, rubrics);
    request.student_id = student;
    request.sheet_id = sheet_id;

    let result = engine.analyze(&request, &reporter).await?;
    let feedback = detailed_feedback(&result, config.analysis.confidence_threshold);

    // Print summary table
    print_summary(&result);
    eprintln!("{}", feedback.overall_performance);
    print_diagnostics(&result);

    // Save outputs
    save_outputs(&result, &config, &output, &format, "sheet")?;

    Ok(())
}

/// Wire the extractor, matchers, and store into an engine.
pub(crate) fn build_engine(config: &GradescanConfig, output: &Path) -> Result<AnalysisEngine> {
    let extractor = Arc::new(TesseractExtractor::new());
    let matcher = create_matcher(config)?;
    let fallback = create_fallback(config);
    let store = Arc::new(JsonFileStore::new(output));

    Ok(
        AnalysisEngine::new(extractor, matcher, config.analysis.clone())
            .with_fallback(fallback)
            .with_store(store),
    )
}

pub(crate) fn print_summary(result: &SheetResult) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Question",
        "Marks",
        "Score",
        "Confidence",
        "Missed potential",
    ]);

    for question in &result.question_results {
        table.add_row(vec![
            Cell::new(question.question_number),
            Cell::new(format!(
                "{:.1}/{}",
                question.effective_marks(),
                question.max_marks
            )),
            Cell::new(format!("{:.1}%", question.percentage())),
            Cell::new(format!("{:.2}", question.confidence_score)),
            Cell::new(format!("{:.1}", question.missed_marks_potential)),
        ]);
    }

    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(format!(
            "{:.1}/{}",
            result.overall_score * result.total_possible_marks,
            result.total_possible_marks
        )),
        Cell::new(format!("{:.1}%", result.percentage_score)),
        Cell::new(format!("{:.2}", result.confidence_score)),
        Cell::new(""),
    ]);

    eprintln!("\n{table}");
}

pub(crate) fn print_diagnostics(result: &SheetResult) {
    if let Some(sequence) = &result.metadata.sequence {
        for issue in &sequence.issues {
            eprintln!("Warning: {issue}");
        }
    }
    for skipped in &result.metadata.skipped {
        eprintln!("Skipped: {skipped}");
    }
    for error in &result.processing_errors {
        eprintln!("Warning: {error}");
    }
}

/// Write the requested report formats for one finished sheet.
///
/// The store already keeps `{output}/{sheet_id}.json` as the canonical latest
/// result; these files are timestamped copies in the formats the user asked
/// for.
pub(crate) fn save_outputs(
    result: &SheetResult,
    config: &GradescanConfig,
    output: &Path,
    format: &str,
    stem: &str,
) -> Result<()> {
    std::fs::create_dir_all(output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");

    let formats: Vec<&str> = if format == "all" {
        vec!["json", "markdown", "csv"]
    } else {
        format.split(',').collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = output.join(format!("{stem}-{timestamp}.json"));
                result.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "markdown" => {
                let feedback = detailed_feedback(result, config.analysis.confidence_threshold);
                let path = output.join(format!("{stem}-{timestamp}.md"));
                write_markdown_report(result, &feedback, &path)?;
                eprintln!("Markdown report: {}", path.display());
            }
            "csv" => {
                let path = output.join(format!("{stem}-{timestamp}.csv"));
                write_csv_report(result, &path)?;
                eprintln!("CSV report: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    Ok(())
}
