//! Confidence filtering and score computation over rubric verdicts.
//!
//! Both matching strategies funnel their raw verdict lists through this
//! module so that filtering and scoring behave identically regardless of
//! where the verdicts came from.

use crate::results::{FilterSummary, MatchOutcome, RubricPointVerdict};

/// Remove low-confidence negative verdicts from `verdicts`.
///
/// YES verdicts always survive. NO and PARTIAL verdicts survive only when
/// their confidence meets `threshold`. The marks a removed verdict withheld
/// (`total_marks - marks_awarded`) are tallied into the summary's
/// `marks_adjustment` so the caller can surface them as missed-marks
/// potential instead of silently deducting them.
pub fn apply_confidence_filter(
    verdicts: Vec<RubricPointVerdict>,
    threshold: f64,
) -> (Vec<RubricPointVerdict>, FilterSummary) {
    let original_count = verdicts.len();
    let mut surviving = Vec::with_capacity(original_count);
    let mut marks_adjustment = 0.0;

    for verdict in verdicts {
        if !verdict.status.is_negative() || verdict.confidence >= threshold {
            surviving.push(verdict);
        } else {
            marks_adjustment += verdict.total_marks - verdict.marks_awarded;
        }
    }

    let summary = FilterSummary {
        threshold,
        original_count,
        surviving_count: surviving.len(),
        marks_adjustment,
    };
    (surviving, summary)
}

/// Build a [`MatchOutcome`] from surviving verdicts.
///
/// The overall score is awarded marks over total marks across the surviving
/// verdicts; the confidence score is their mean confidence. Both default to
/// zero when no verdicts survive. Missed-marks potential is exactly the
/// filter's marks adjustment: the marks withheld by verdicts too uncertain
/// to count against the student.
pub fn outcome_from_verdicts(
    verdicts: Vec<RubricPointVerdict>,
    summary: String,
    filtering: FilterSummary,
) -> MatchOutcome {
    let total: f64 = verdicts.iter().map(|v| v.total_marks).sum();
    let awarded: f64 = verdicts.iter().map(|v| v.marks_awarded).sum();
    let overall_score = if total > 0.0 { awarded / total } else { 0.0 };

    let confidence_score = if verdicts.is_empty() {
        0.0
    } else {
        verdicts.iter().map(|v| v.confidence).sum::<f64>() / verdicts.len() as f64
    };

    MatchOutcome {
        verdicts,
        overall_score,
        missed_marks_potential: filtering.marks_adjustment,
        confidence_score,
        summary,
        filtering,
    }
}
