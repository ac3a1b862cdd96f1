//! Student-facing feedback synthesis.
//!
//! Pure functions over a finished [`SheetResult`]: banded performance
//! sentences, per-question suggestions, a confidence assessment, and
//! recurring-weakness patterns.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::results::{QuestionResult, SheetResult, VerdictStatus};
use crate::statistics;

/// Everything the report layer needs to narrate one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedFeedback {
    pub overall_performance: String,
    pub question_feedback: Vec<QuestionFeedback>,
    pub improvement_suggestions: Vec<String>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub confidence_assessment: ConfidenceAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question_number: u32,
    /// Effective over maximum marks, e.g. `5.0/8`.
    pub score: String,
    pub percentage: String,
    pub feedback: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAssessment {
    pub overall_confidence: f64,
    /// `High`, `Medium`, or `Low`.
    pub reliability: String,
    pub note: String,
}

/// Assemble the full feedback bundle for one sheet.
///
/// `confidence_threshold` gates which missed scoring points are confident
/// enough to turn into sheet-wide improvement suggestions.
pub fn detailed_feedback(sheet: &SheetResult, confidence_threshold: f64) -> DetailedFeedback {
    let question_feedback = sheet
        .question_results
        .iter()
        .map(|q| QuestionFeedback {
            question_number: q.question_number,
            score: format!("{:.1}/{}", q.effective_marks(), q.max_marks),
            percentage: format!("{:.1}%", q.percentage()),
            feedback: question_feedback_sentence(q.percentage()),
            suggestions: question_suggestions(q),
        })
        .collect();

    let (strengths, areas_for_improvement) = performance_patterns(sheet);

    DetailedFeedback {
        overall_performance: overall_feedback(sheet.percentage_score),
        question_feedback,
        improvement_suggestions: statistics::improvement_suggestions(
            &sheet.question_results,
            confidence_threshold,
        ),
        strengths,
        areas_for_improvement,
        confidence_assessment: assess_confidence(sheet.confidence_score),
    }
}

/// Banded overall-performance sentence for a percentage score.
pub fn overall_feedback(percentage: f64) -> String {
    if percentage >= 90.0 {
        format!("Excellent work! You scored {percentage:.1}%, demonstrating strong understanding across all topics.")
    } else if percentage >= 80.0 {
        format!("Very good performance! You scored {percentage:.1}% with solid understanding of most concepts.")
    } else if percentage >= 70.0 {
        format!("Good work! You scored {percentage:.1}%. There are a few areas where you can improve.")
    } else if percentage >= 60.0 {
        format!("Fair performance at {percentage:.1}%. Focus on understanding key concepts and practice more.")
    } else {
        format!("You scored {percentage:.1}%. Consider reviewing the material and seeking additional help.")
    }
}

/// Banded sentence for one question's percentage.
pub fn question_feedback_sentence(percentage: f64) -> String {
    if percentage >= 90.0 {
        "Excellent answer with clear understanding and proper methodology.".to_string()
    } else if percentage >= 80.0 {
        "Good answer with minor areas for improvement.".to_string()
    } else if percentage >= 60.0 {
        "Partial understanding shown, but missing some key elements.".to_string()
    } else {
        "Needs significant improvement. Review the concept and practice similar problems.".to_string()
    }
}

/// Label the sheet's analysis confidence and attach the operator note.
pub fn assess_confidence(confidence: f64) -> ConfidenceAssessment {
    let (reliability, note) = if confidence >= 0.8 {
        ("High", "High confidence - analysis is likely accurate")
    } else if confidence >= 0.6 {
        ("Medium", "Medium confidence - some answers may need verification")
    } else {
        ("Low", "Low confidence - consider manual review of answers")
    };
    ConfidenceAssessment {
        overall_confidence: confidence,
        reliability: reliability.to_string(),
        note: note.to_string(),
    }
}

/// Up to three missing-content suggestions for one question, taking the
/// lowest-confidence surviving negatives first.
fn question_suggestions(question: &QuestionResult) -> Vec<String> {
    let mut candidates: Vec<_> = question
        .verdicts
        .iter()
        .filter(|v| v.status.is_negative())
        .filter(|v| v.missing_content.as_deref().is_some_and(|m| !m.is_empty()))
        .collect();
    candidates.sort_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(Ordering::Equal)
    });
    candidates
        .into_iter()
        .take(3)
        .filter_map(|v| v.missing_content.clone())
        .collect()
}

/// Strengths and weaknesses that recur across the sheet.
fn performance_patterns(sheet: &SheetResult) -> (Vec<String>, Vec<String>) {
    let questions = &sheet.question_results;
    if questions.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let total = questions.len() as f64;

    let mut strengths = Vec::new();
    let mut areas = Vec::new();

    let high_scoring = questions.iter().filter(|q| q.overall_score >= 0.8).count();
    let low_scoring = questions.iter().filter(|q| q.overall_score < 0.6).count();

    if high_scoring as f64 >= total * 0.7 {
        strengths.push("Consistent good performance across most questions".to_string());
    }
    if low_scoring as f64 >= total * 0.3 {
        areas.push("Multiple questions need significant improvement".to_string());
    }

    // Count confidently-missed element categories over NO verdicts.
    let mut methodology = 0usize;
    let mut explanations = 0usize;
    let mut calculations = 0usize;
    for question in questions {
        for verdict in &question.verdicts {
            if verdict.status != VerdictStatus::No {
                continue;
            }
            let point = verdict.rubric_point.to_lowercase();
            if point.contains("method") {
                methodology += 1;
            } else if point.contains("explanation") {
                explanations += 1;
            } else if point.contains("calculation") || point.contains("formula") {
                calculations += 1;
            }
        }
    }
    for (category, count) in [
        ("methodology", methodology),
        ("explanations", explanations),
        ("calculations", calculations),
    ] {
        if count as f64 >= total * 0.3 {
            areas.push(format!("Focus on improving {category}"));
        }
    }

    (strengths, areas)
}
