//! Deterministic keyword fallback matcher.
//!
//! Judges each scoring point by case-insensitive keyword presence alone, so
//! grading still produces a result when no inference service is reachable.
//! Verdicts are only ever YES or NO; nuance is the semantic matcher's job.

use async_trait::async_trait;
use tracing::debug;

use gradescan_core::error::MatchError;
use gradescan_core::filter::{apply_confidence_filter, outcome_from_verdicts};
use gradescan_core::model::Rubric;
use gradescan_core::results::{MatchOutcome, RubricPointVerdict, VerdictStatus};
use gradescan_core::traits::RubricMatcher;

const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Keyword hits prove little about correctness, so a match earns full marks
/// at modest confidence. An absent keyword is better evidence of an absent
/// point, hence the higher NO confidence, chosen to survive the default
/// filter threshold.
const YES_CONFIDENCE: f64 = 0.6;
const NO_CONFIDENCE: f64 = 0.7;

/// Rubric matcher that scores by keyword presence.
pub struct KeywordMatcher {
    confidence_threshold: f64,
}

impl KeywordMatcher {
    pub fn new() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RubricMatcher for KeywordMatcher {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn analyze(
        &self,
        response_text: &str,
        rubric: &Rubric,
    ) -> Result<MatchOutcome, MatchError> {
        let haystack = response_text.to_lowercase();

        let mut verdicts = Vec::with_capacity(rubric.marking_scheme.len());
        for point in &rubric.marking_scheme {
            let hits: Vec<&str> = point
                .keywords
                .iter()
                .filter(|keyword| haystack.contains(&keyword.to_lowercase()))
                .map(String::as_str)
                .collect();

            let verdict = if hits.is_empty() {
                RubricPointVerdict {
                    rubric_point: point.description.clone(),
                    status: VerdictStatus::No,
                    confidence: NO_CONFIDENCE,
                    evidence: None,
                    missing_content: Some(format!("Should include: {}", point.description)),
                    marks_awarded: 0.0,
                    total_marks: point.marks,
                }
            } else {
                RubricPointVerdict {
                    rubric_point: point.description.clone(),
                    status: VerdictStatus::Yes,
                    confidence: YES_CONFIDENCE,
                    evidence: Some(format!("Found: {}", hits.join(", "))),
                    missing_content: None,
                    marks_awarded: point.marks,
                    total_marks: point.marks,
                }
            };
            verdicts.push(verdict);
        }

        let matched = verdicts
            .iter()
            .filter(|v| v.status == VerdictStatus::Yes)
            .count();
        let total = verdicts.len();
        debug!(
            question = rubric.question_number,
            matched, total, "keyword scan complete"
        );

        let summary = format!("Keyword scan matched {matched} of {total} scoring points.");
        let (surviving, filtering) = apply_confidence_filter(verdicts, self.confidence_threshold);
        Ok(outcome_from_verdicts(surviving, summary, filtering))
    }
}
