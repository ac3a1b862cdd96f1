//! The `gradescan batch` command.

use std::path::PathBuf;

use anyhow::Result;

use gradescan_core::engine::AnalysisRequest;
use gradescan_core::parser;
use gradescan_core::results::SheetResult;
use gradescan_core::statistics::batch_summary;
use gradescan_matchers::config::load_config_from;

use super::analyze::{build_engine, print_diagnostics, save_outputs, ConsoleReporter};

/// Extensions treated as scanned sheet images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif"];

pub async fn execute(
    directory: PathBuf,
    rubrics_path: PathBuf,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        directory.is_dir(),
        "not a directory: {}",
        directory.display()
    );

    let config = load_config_from(config_path.as_deref())?;
    let output = output.unwrap_or_else(|| config.results_dir.clone());
    let rubrics = parser::load_rubrics(&rubrics_path)?;

    // Collect sheet images, sorted for a stable processing order.
    let mut images: Vec<PathBuf> = std::fs::read_dir(&directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    images.sort();

    anyhow::ensure!(
        !images.is_empty(),
        "no sheet images found in {}",
        directory.display()
    );

    eprintln!(
        "gradescan v0.1.0: analyzing {} sheet(s) against {} rubric(s)",
        images.len(),
        rubrics.len()
    );

    let engine = build_engine(&config, &output)?;
    let reporter = ConsoleReporter;

    let mut results = Vec::with_capacity(images.len());
    for image in &images {
        // The file stem doubles as the sheet id so results stay traceable
        // back to the scan that produced them.
        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet")
            .to_string();
        eprintln!("\nSheet: {}", image.display());

        let mut request = AnalysisRequest::new(image.clone(), rubrics.clone());
        request.sheet_id = Some(stem.clone());

        let result = engine.analyze(&request, &reporter).await?;
        print_diagnostics(&result);
        save_outputs(&result, &config, &output, &format, &stem)?;
        results.push(result);
    }

    print_batch_summary(&results);

    // Save the batch aggregate alongside the per-sheet files.
    let summary = batch_summary(&results);
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("batch-{timestamp}.json"));
    std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
    eprintln!("Batch summary saved to: {}", path.display());

    Ok(())
}

fn print_batch_summary(results: &[SheetResult]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Sheet", "Questions", "Score", "Confidence", "Errors"]);

    for result in results {
        table.add_row(vec![
            Cell::new(&result.sheet_id),
            Cell::new(format!(
                "{}/{}",
                result.analyzed_questions, result.total_questions
            )),
            Cell::new(format!("{:.1}%", result.percentage_score)),
            Cell::new(format!("{:.2}", result.confidence_score)),
            Cell::new(result.processing_errors.len()),
        ]);
    }

    eprintln!("\n{table}");

    let summary = batch_summary(results);
    eprintln!(
        "Batch: {} sheet(s), {} question(s) analyzed, mean score {:.1}% at confidence {:.2}, {} sheet(s) with errors",
        summary.sheet_count,
        summary.questions_analyzed,
        summary.mean_percentage,
        summary.mean_confidence,
        summary.sheets_with_errors,
    );
}
