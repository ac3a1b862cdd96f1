//! Central analysis orchestrator.
//!
//! Drives one sheet through extraction, segmentation, per-question rubric
//! matching, and aggregation. Extraction and segmentation failures produce
//! a single-error result; matching failures stay local to their question.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::Rubric;
use crate::parser;
use crate::results::{AnalysisMetadata, QuestionResult, SheetResult};
use crate::segmenter::QuestionSegmenter;
use crate::store::ResultStore;
use crate::traits::{RubricMatcher, TextExtractor};

/// Thresholds and switches for one analysis run.
///
/// All tunables live here so tests can vary them per case; a snapshot is
/// recorded in every result's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Negative verdicts below this confidence are filtered out.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Minimum characters of recognized text worth analyzing.
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    /// Hard cap on questions matched per sheet.
    #[serde(default = "default_max_questions")]
    pub max_questions_per_sheet: usize,
    /// Use the AI-backed matcher; off means keyword matching only.
    #[serde(default = "default_true")]
    pub enable_ai_analysis: bool,
    /// Persist each finished sheet through the configured store.
    #[serde(default = "default_true")]
    pub save_intermediate_results: bool,
    /// Retry a failed question once with the fallback matcher.
    #[serde(default)]
    pub fallback_on_error: bool,
    /// Delay between successive matcher calls.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_min_text_length() -> usize {
    10
}

fn default_max_questions() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_pacing_delay_ms() -> u64 {
    100
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            min_text_length: default_min_text_length(),
            max_questions_per_sheet: default_max_questions(),
            enable_ai_analysis: true,
            save_intermediate_results: true,
            fallback_on_error: false,
            pacing_delay_ms: default_pacing_delay_ms(),
        }
    }
}

/// One sheet to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image_path: PathBuf,
    pub rubrics: Vec<Rubric>,
    pub student_id: Option<String>,
    /// Explicit sheet id; a v4 UUID is minted when absent.
    pub sheet_id: Option<String>,
    /// Cooperative cancellation flag, checked before each question.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl AnalysisRequest {
    pub fn new(image_path: impl Into<PathBuf>, rubrics: Vec<Rubric>) -> Self {
        Self {
            image_path: image_path.into(),
            rubrics,
            student_id: None,
            sheet_id: None,
            cancel: None,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_question_start(&self, question_number: u32);
    fn on_question_complete(&self, result: &QuestionResult);
    fn on_question_error(&self, question_number: u32, error: &str);
    fn on_sheet_complete(&self, result: &SheetResult);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_question_start(&self, _: u32) {}
    fn on_question_complete(&self, _: &QuestionResult) {}
    fn on_question_error(&self, _: u32, _: &str) {}
    fn on_sheet_complete(&self, _: &SheetResult) {}
}

/// The central analysis engine.
pub struct AnalysisEngine {
    extractor: Arc<dyn TextExtractor>,
    matcher: Arc<dyn RubricMatcher>,
    fallback: Option<Arc<dyn RubricMatcher>>,
    store: Option<Arc<dyn ResultStore>>,
    segmenter: QuestionSegmenter,
    config: AnalysisConfig,
}

impl AnalysisEngine {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        matcher: Arc<dyn RubricMatcher>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            extractor,
            matcher,
            fallback: None,
            store: None,
            segmenter: QuestionSegmenter::new(),
            config,
        }
    }

    /// Matcher to retry a question with when `fallback_on_error` is set.
    pub fn with_fallback(mut self, fallback: Arc<dyn RubricMatcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Store for automatic persistence of finished sheets.
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one sheet against its rubrics.
    ///
    /// Invalid rubrics reject the request up front; every later failure is
    /// captured inside the returned [`SheetResult`] instead.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<SheetResult, crate::error::ValidationError> {
        parser::validate_rubrics(&request.rubrics)?;

        let mut result = self.run_pipeline(request, progress).await;

        if self.config.save_intermediate_results {
            if let Some(store) = &self.store {
                if let Err(e) = store.save(&result) {
                    warn!(sheet_id = %result.sheet_id, "failed to persist result: {e:#}");
                    result.processing_errors.push(format!("persistence: {e:#}"));
                }
            }
        }

        progress.on_sheet_complete(&result);
        Ok(result)
    }

    async fn run_pipeline(
        &self,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> SheetResult {
        let start = Instant::now();
        let sheet_id = request
            .sheet_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info!(
            sheet_id = %sheet_id,
            image = %request.image_path.display(),
            rubrics = request.rubrics.len(),
            matcher = self.matcher.name(),
            "starting sheet analysis"
        );

        let mut metadata = AnalysisMetadata {
            image_path: request.image_path.display().to_string(),
            rubric_count: request.rubrics.len(),
            extraction: None,
            sequence: None,
            skipped: Vec::new(),
            config: Some(self.config.clone()),
        };

        let extraction = match self.extractor.extract(&request.image_path).await {
            Ok(extraction) => extraction,
            Err(e) => {
                return self.error_result(
                    sheet_id,
                    request,
                    format!("extraction: {e}"),
                    metadata,
                    start,
                );
            }
        };
        metadata.extraction = Some(extraction.metadata.clone());

        if extraction.raw_text.trim().len() < self.config.min_text_length {
            return self.error_result(
                sheet_id,
                request,
                format!(
                    "extraction: recognized text too short ({} chars, need {})",
                    extraction.raw_text.trim().len(),
                    self.config.min_text_length
                ),
                metadata,
                start,
            );
        }

        let segmentation = match self.segmenter.segment(&extraction) {
            Ok(segmentation) => segmentation,
            Err(e) => {
                return self.error_result(
                    sheet_id,
                    request,
                    format!("segmentation: {e}"),
                    metadata,
                    start,
                );
            }
        };
        metadata.sequence = Some(segmentation.sequence.clone());

        let rubric_by_number: HashMap<u32, &Rubric> = request
            .rubrics
            .iter()
            .map(|r| (r.question_number, r))
            .collect();

        let mut question_results: Vec<QuestionResult> = Vec::new();
        let mut processing_errors: Vec<String> = Vec::new();
        let mut matched_any = false;

        for (number, segment) in &segmentation.segments {
            if request.is_cancelled() {
                warn!(sheet_id = %sheet_id, "analysis cancelled before question {number}");
                processing_errors.push(format!("analysis cancelled before question {number}"));
                break;
            }

            if question_results.len() >= self.config.max_questions_per_sheet {
                metadata.skipped.push(format!(
                    "question {number}: over the question cap ({})",
                    self.config.max_questions_per_sheet
                ));
                continue;
            }

            let Some(rubric) = rubric_by_number.get(number) else {
                debug!(question = number, "skipping question without a rubric");
                metadata
                    .skipped
                    .push(format!("question {number}: no rubric provided"));
                continue;
            };

            if segment.response_text.len() < self.config.min_text_length {
                debug!(question = number, "skipping question with too little text");
                metadata.skipped.push(format!(
                    "question {number}: response too short ({} chars)",
                    segment.response_text.len()
                ));
                continue;
            }

            // Pacing between successive matcher calls.
            if matched_any && self.config.pacing_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.pacing_delay_ms)).await;
            }
            matched_any = true;

            progress.on_question_start(*number);
            let question_start = Instant::now();

            let matched = match self.matcher.analyze(&segment.response_text, rubric).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => match self.retry_matcher() {
                    Some(fallback) => {
                        warn!(
                            question = number,
                            "matcher '{}' failed ({e}); retrying with '{}'",
                            self.matcher.name(),
                            fallback.name()
                        );
                        fallback.analyze(&segment.response_text, rubric).await
                    }
                    None => Err(e),
                },
            };
            let outcome = match matched {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = format!("question {number} analysis failed: {e}");
                    progress.on_question_error(*number, &message);
                    processing_errors.push(message);
                    continue;
                }
            };

            let question_result = QuestionResult {
                question_number: *number,
                detected_text: segment.response_text.clone(),
                verdicts: outcome.verdicts,
                overall_score: outcome.overall_score,
                max_marks: rubric.max_marks,
                missed_marks_potential: outcome.missed_marks_potential,
                confidence_score: outcome.confidence_score,
                summary: outcome.summary,
                processing_time_ms: question_start.elapsed().as_millis() as u64,
            };
            progress.on_question_complete(&question_result);
            question_results.push(question_result);
        }

        let total_possible_marks: f64 = question_results.iter().map(|q| q.max_marks).sum();
        let effective_marks: f64 = question_results.iter().map(|q| q.effective_marks()).sum();
        let overall_score = if total_possible_marks > 0.0 {
            effective_marks / total_possible_marks
        } else {
            0.0
        };
        let confidence_score = if question_results.is_empty() {
            0.0
        } else {
            question_results
                .iter()
                .map(|q| q.confidence_score)
                .sum::<f64>()
                / question_results.len() as f64
        };

        let result = SheetResult {
            sheet_id,
            student_id: request.student_id.clone(),
            total_questions: request.rubrics.len(),
            analyzed_questions: question_results.len(),
            overall_score,
            total_possible_marks,
            percentage_score: overall_score * 100.0,
            confidence_score,
            analysis_time_ms: start.elapsed().as_millis() as u64,
            created_at: chrono::Utc::now(),
            question_results,
            processing_errors,
            metadata,
        };
        info!(
            sheet_id = %result.sheet_id,
            analyzed = result.analyzed_questions,
            total = result.total_questions,
            percentage = format!("{:.1}", result.percentage_score),
            errors = result.processing_errors.len(),
            "sheet analysis finished"
        );
        result
    }

    /// The matcher to retry a failed question with, when enabled.
    fn retry_matcher(&self) -> Option<&Arc<dyn RubricMatcher>> {
        if self.config.fallback_on_error {
            self.fallback.as_ref()
        } else {
            None
        }
    }

    /// A pipeline-fatal failure: zero questions analyzed, one error entry.
    fn error_result(
        &self,
        sheet_id: String,
        request: &AnalysisRequest,
        error: String,
        metadata: AnalysisMetadata,
        start: Instant,
    ) -> SheetResult {
        warn!(sheet_id = %sheet_id, "sheet analysis failed: {error}");
        SheetResult {
            sheet_id,
            student_id: request.student_id.clone(),
            total_questions: request.rubrics.len(),
            analyzed_questions: 0,
            overall_score: 0.0,
            total_possible_marks: 0.0,
            percentage_score: 0.0,
            confidence_score: 0.0,
            analysis_time_ms: start.elapsed().as_millis() as u64,
            created_at: chrono::Utc::now(),
            question_results: Vec::new(),
            processing_errors: vec![error],
            metadata,
        }
    }
}
