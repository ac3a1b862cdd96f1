//! Analysis result types with JSON persistence.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::AnalysisConfig;
use crate::model::ExtractionMetadata;
use crate::segmenter::SequenceReport;

/// A matcher's judgment on one scoring point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    /// The point is clearly and correctly addressed.
    Yes,
    /// The point is not addressed, or addressed with major errors.
    No,
    /// The point is partially addressed or carries minor errors.
    Partial,
}

impl VerdictStatus {
    /// `true` for `No` and `Partial` — the statuses subject to confidence
    /// filtering.
    pub fn is_negative(&self) -> bool {
        matches!(self, VerdictStatus::No | VerdictStatus::Partial)
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictStatus::Yes => write!(f, "YES"),
            VerdictStatus::No => write!(f, "NO"),
            VerdictStatus::Partial => write!(f, "PARTIAL"),
        }
    }
}

impl FromStr for VerdictStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES" => Ok(VerdictStatus::Yes),
            "NO" => Ok(VerdictStatus::No),
            "PARTIAL" => Ok(VerdictStatus::Partial),
            other => Err(format!("invalid verdict status: {other}")),
        }
    }
}

/// Outcome for one scoring point of one question.
///
/// Invariant: `0 <= marks_awarded <= total_marks` and `0 <= confidence <= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricPointVerdict {
    /// Description of the scoring point this verdict is about.
    pub rubric_point: String,
    pub status: VerdictStatus,
    pub confidence: f64,
    /// Quote from the response supporting the verdict. `None` for `No`.
    #[serde(default)]
    pub evidence: Option<String>,
    /// What the answer should have contained, for `No`/`Partial`.
    #[serde(default)]
    pub missing_content: Option<String>,
    pub marks_awarded: f64,
    pub total_marks: f64,
}

/// What the confidence filter did to a verdict list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FilterSummary {
    /// Threshold negative verdicts had to meet to survive.
    pub threshold: f64,
    /// Verdicts before filtering.
    pub original_count: usize,
    /// Verdicts kept.
    pub surviving_count: usize,
    /// Marks the removed verdicts would have deducted.
    pub marks_adjustment: f64,
}

/// A matcher strategy's result for one question, after confidence filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Surviving verdicts.
    pub verdicts: Vec<RubricPointVerdict>,
    /// Marks-weighted fraction over surviving verdicts, in [0, 1].
    pub overall_score: f64,
    /// Deductions held back because the verdicts claiming them were removed
    /// as low-confidence.
    pub missed_marks_potential: f64,
    /// Mean confidence over surviving verdicts, 0 when none survive.
    pub confidence_score: f64,
    /// Strategy's one-line account of the answer.
    #[serde(default)]
    pub summary: String,
    pub filtering: FilterSummary,
}

/// One question's graded result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_number: u32,
    /// The segment text the matcher judged.
    pub detected_text: String,
    pub verdicts: Vec<RubricPointVerdict>,
    /// Marks-weighted fraction in [0, 1].
    pub overall_score: f64,
    /// The rubric's maximum marks for this question.
    pub max_marks: f64,
    pub missed_marks_potential: f64,
    pub confidence_score: f64,
    #[serde(default)]
    pub summary: String,
    pub processing_time_ms: u64,
}

impl QuestionResult {
    /// Marks this question contributes to the sheet total.
    pub fn effective_marks(&self) -> f64 {
        self.overall_score * self.max_marks
    }

    /// Question score as a percentage.
    pub fn percentage(&self) -> f64 {
        self.overall_score * 100.0
    }
}

/// Everything recorded about one analysis run besides the scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Path of the analyzed image.
    pub image_path: String,
    /// Number of rubrics supplied with the request.
    pub rubric_count: usize,
    /// Extraction run details, absent when extraction never ran or failed.
    #[serde(default)]
    pub extraction: Option<ExtractionMetadata>,
    /// Advisory question-sequence diagnostics from segmentation.
    #[serde(default)]
    pub sequence: Option<SequenceReport>,
    /// Questions skipped with the reason (no rubric, response too short).
    #[serde(default)]
    pub skipped: Vec<String>,
    /// The configuration the run used.
    #[serde(default)]
    pub config: Option<AnalysisConfig>,
}

/// The terminal artifact of one sheet analysis. Constructed once, never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetResult {
    pub sheet_id: String,
    #[serde(default)]
    pub student_id: Option<String>,
    /// Number of rubrics supplied (the questions the sheet was expected to
    /// answer).
    pub total_questions: usize,
    /// Questions that produced a graded result.
    pub analyzed_questions: usize,
    /// Marks-weighted fraction over analyzed questions, in [0, 1].
    pub overall_score: f64,
    /// Sum of max marks over analyzed questions.
    pub total_possible_marks: f64,
    pub percentage_score: f64,
    /// Mean per-question confidence, 0 when nothing was analyzed.
    pub confidence_score: f64,
    pub analysis_time_ms: u64,
    pub created_at: DateTime<Utc>,
    pub question_results: Vec<QuestionResult>,
    /// Every failure caught during the run, in stage order.
    pub processing_errors: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl SheetResult {
    /// Save the result as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a result from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let result: SheetResult =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(result)
    }
}
