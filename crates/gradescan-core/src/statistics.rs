//! Aggregate statistics over analyzed questions and sheets.
//!
//! Pure functions over finished results: confidence summaries, sheet-wide
//! improvement suggestions, and batch aggregates for multi-sheet runs.

use serde::{Deserialize, Serialize};

use crate::results::{QuestionResult, SheetResult};

/// A question at or above this confidence counts as reliable.
pub const RELIABLE_CONFIDENCE: f64 = 0.7;

/// Hard cap on sheet-wide improvement suggestions.
pub const MAX_SUGGESTIONS: usize = 8;

/// How trustworthy the per-question judgments of one sheet are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    /// Mean per-question confidence.
    pub overall_confidence: f64,
    /// Questions with confidence at or above [`RELIABLE_CONFIDENCE`].
    pub reliable_questions: usize,
    pub total_questions: usize,
    pub reliability_ratio: f64,
}

/// Summarize per-question confidence across a sheet.
pub fn confidence_summary(questions: &[QuestionResult]) -> ConfidenceSummary {
    if questions.is_empty() {
        return ConfidenceSummary {
            overall_confidence: 0.0,
            reliable_questions: 0,
            total_questions: 0,
            reliability_ratio: 0.0,
        };
    }

    let total: f64 = questions.iter().map(|q| q.confidence_score).sum();
    let reliable = questions
        .iter()
        .filter(|q| q.confidence_score >= RELIABLE_CONFIDENCE)
        .count();

    ConfidenceSummary {
        overall_confidence: total / questions.len() as f64,
        reliable_questions: reliable,
        total_questions: questions.len(),
        reliability_ratio: reliable as f64 / questions.len() as f64,
    }
}

/// Build actionable suggestions from confidently missed scoring points.
///
/// Each qualifying verdict contributes a `Q{n}: {missing content}` line;
/// recurring topic buckets add one general-advice line each. The combined
/// list is capped at [`MAX_SUGGESTIONS`].
pub fn improvement_suggestions(
    questions: &[QuestionResult],
    confidence_threshold: f64,
) -> Vec<String> {
    let mut suggestions = Vec::new();
    let mut missed_formula = false;
    let mut missed_method = false;
    let mut missed_explanation = false;

    for question in questions {
        for verdict in &question.verdicts {
            if !verdict.status.is_negative() || verdict.confidence < confidence_threshold {
                continue;
            }
            let Some(missing) = verdict.missing_content.as_deref().filter(|m| !m.is_empty())
            else {
                continue;
            };
            suggestions.push(format!("Q{}: {missing}", question.question_number));

            let point = verdict.rubric_point.to_lowercase();
            if point.contains("formula") || point.contains("equation") {
                missed_formula = true;
            } else if point.contains("method") || point.contains("procedure") {
                missed_method = true;
            } else if point.contains("explanation") || point.contains("reasoning") {
                missed_explanation = true;
            }
        }
    }

    if missed_formula {
        suggestions.push("General: Review and practice formula applications".to_string());
    }
    if missed_method {
        suggestions.push("General: Focus on showing clear step-by-step methods".to_string());
    }
    if missed_explanation {
        suggestions.push("General: Provide more detailed explanations for your reasoning".to_string());
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Aggregates over a batch of sheet analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub sheet_count: usize,
    pub questions_analyzed: usize,
    pub mean_percentage: f64,
    pub mean_confidence: f64,
    /// Sheets with at least one processing error.
    pub sheets_with_errors: usize,
}

/// Summarize a batch of finished sheets.
pub fn batch_summary(results: &[SheetResult]) -> BatchSummary {
    if results.is_empty() {
        return BatchSummary {
            sheet_count: 0,
            questions_analyzed: 0,
            mean_percentage: 0.0,
            mean_confidence: 0.0,
            sheets_with_errors: 0,
        };
    }

    let n = results.len() as f64;
    BatchSummary {
        sheet_count: results.len(),
        questions_analyzed: results.iter().map(|r| r.analyzed_questions).sum(),
        mean_percentage: results.iter().map(|r| r.percentage_score).sum::<f64>() / n,
        mean_confidence: results.iter().map(|r| r.confidence_score).sum::<f64>() / n,
        sheets_with_errors: results
            .iter()
            .filter(|r| !r.processing_errors.is_empty())
            .count(),
    }
}
