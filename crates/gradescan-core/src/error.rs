//! Pipeline error types.
//!
//! Each pipeline stage has its own error enum so the analysis engine can
//! classify failures without string matching: extraction and total
//! segmentation failures end the sheet, matcher failures stay local to one
//! question, and rubric validation failures block the run before it starts.

use thiserror::Error;

/// Errors raised while turning an image into recognized text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file is missing, not a decodable raster image, or unreadable.
    #[error("unreadable image: {0}")]
    Unreadable(String),

    /// The image is outside the accepted 100x100 .. 5000x5000 pixel range.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The file exceeds the size ceiling.
    #[error("image file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    /// The OCR engine itself failed (missing binary, bad exit, bad output).
    #[error("OCR engine failure: {0}")]
    Engine(String),

    /// The OCR engine did not finish within the allotted time.
    #[error("OCR timed out after {0}s")]
    Timeout(u64),
}

impl ExtractError {
    /// Returns `true` when the input itself is at fault and a retry with the
    /// same file cannot succeed.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExtractError::Unreadable(_)
                | ExtractError::InvalidDimensions { .. }
                | ExtractError::TooLarge { .. }
        )
    }
}

/// Errors raised while grouping tokens into question segments.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// No question segment survived detection and assignment.
    #[error("no question segments detected in {token_count} tokens")]
    NoSegments { token_count: usize },
}

/// Errors raised by a rubric-matcher strategy for a single question.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The service reply could not be parsed as the expected JSON shape.
    #[error("unparsable matcher response: {0}")]
    Parse(String),

    /// The reply parsed but violated the verdict schema.
    #[error("schema violation in matcher response: {0}")]
    SchemaViolation(String),

    /// The reply parsed but contained no verdicts to score.
    #[error("matcher response contained no verdicts")]
    EmptyResponse,

    /// The inference call did not complete in time.
    #[error("matcher request timed out after {0}s")]
    Timeout(u64),

    /// Transport-level failure reaching the inference service.
    #[error("network error: {0}")]
    Network(String),

    /// Authentication with the inference service failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found on the inference service.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The inference service returned an error response.
    #[error("inference API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl MatchError {
    /// Returns `true` for timeout or transport failures, where a retry with
    /// the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MatchError::Timeout(_) | MatchError::Network(_) | MatchError::Api { status: 429, .. }
        )
    }

    /// Returns `true` when the service answered but the payload was unusable.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            MatchError::Parse(_) | MatchError::SchemaViolation(_) | MatchError::EmptyResponse
        )
    }
}

/// Rubric validation failure. Carries one message per violation so the
/// caller can report all of them at once.
#[derive(Debug, Error)]
#[error("invalid rubrics: {}", messages.join("; "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }
}
