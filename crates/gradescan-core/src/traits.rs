//! Core trait definitions for text extractors and rubric matchers.
//!
//! These async traits are implemented by the `gradescan-extract` and
//! `gradescan-matchers` crates respectively.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ExtractError, MatchError};
use crate::model::{ExtractionResult, Rubric};
use crate::results::MatchOutcome;

// ---------------------------------------------------------------------------
// Text extractor trait
// ---------------------------------------------------------------------------

/// Trait for OCR backends that turn a raster image into recognized tokens.
///
/// Implementations validate the image (readability, dimension and size
/// limits) before any recognition work and never retry on their own.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Human-readable engine name (e.g. "tesseract").
    fn name(&self) -> &str;

    /// Extract tokens and concatenated text from the image at `image_path`.
    async fn extract(&self, image_path: &Path) -> Result<ExtractionResult, ExtractError>;
}

// ---------------------------------------------------------------------------
// Rubric matcher trait
// ---------------------------------------------------------------------------

/// Trait for matching one question's response text against its rubric.
///
/// The two shipped strategies (semantic, keyword) are interchangeable behind
/// this contract; the analysis engine holds a `dyn RubricMatcher` and never
/// branches on the concrete strategy. Implementations apply the confidence
/// filter before returning, so an outcome's verdict list is always the
/// surviving list.
#[async_trait]
pub trait RubricMatcher: Send + Sync {
    /// Strategy name (e.g. "semantic", "keyword").
    fn name(&self) -> &str;

    /// Judge `response_text` against every scoring point of `rubric`.
    async fn analyze(
        &self,
        response_text: &str,
        rubric: &Rubric,
    ) -> Result<MatchOutcome, MatchError>;
}

// ---------------------------------------------------------------------------
// Model response cleanup
// ---------------------------------------------------------------------------

/// Strip markdown formatting artifacts from an inference-service reply.
///
/// Models often wrap the requested JSON in ```json fences or lead with a
/// sentence of prose. This removes fence markers and trims; it does not
/// attempt brace extraction — that is the separate second-chance step in
/// [`extract_json_object`].
pub fn clean_model_response(response: &str) -> String {
    let mut text = response.replace("```json", "");
    // A bare closing fence commonly survives on its own line.
    text = text.replace("```", "");
    text.trim().to_string()
}

/// Extract the outermost `{` .. `}` substring from a reply.
///
/// Returns `None` when no brace-delimited object is present. Used as the
/// second parse attempt after [`clean_model_response`], to salvage replies
/// that surround the JSON with prose.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}
