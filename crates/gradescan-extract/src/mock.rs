//! Mock extractor for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use gradescan_core::error::ExtractError;
use gradescan_core::model::{
    BoundingBox, ExtractionMetadata, ExtractionResult, RecognizedToken,
};
use gradescan_core::traits::TextExtractor;

/// A mock OCR extractor for testing the analysis engine without image files
/// or a Tesseract install.
///
/// Returns configurable results based on image path matching.
pub struct MockExtractor {
    /// Map of path substring → canned extraction.
    responses: HashMap<String, ExtractionResult>,
    /// Default result if no path matches.
    default_result: ExtractionResult,
    /// When set, every call fails with this engine error.
    failure: Option<String>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last path received.
    last_path: Mutex<Option<PathBuf>>,
}

impl MockExtractor {
    /// Create a new mock extractor with the given path→result mappings.
    pub fn new(responses: HashMap<String, ExtractionResult>) -> Self {
        Self {
            responses,
            default_result: placeholder_result(),
            failure: None,
            call_count: AtomicU32::new(0),
            last_path: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same result.
    pub fn with_fixed_result(result: ExtractionResult) -> Self {
        Self {
            responses: HashMap::new(),
            default_result: result,
            failure: None,
            call_count: AtomicU32::new(0),
            last_path: Mutex::new(None),
        }
    }

    /// Create a mock whose every call fails with an engine error.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: HashMap::new(),
            default_result: placeholder_result(),
            failure: Some(message.to_string()),
            call_count: AtomicU32::new(0),
            last_path: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this extractor.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last image path this extractor was asked about.
    pub fn last_path(&self) -> Option<PathBuf> {
        self.last_path.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract(&self, image_path: &Path) -> Result<ExtractionResult, ExtractError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_path.lock().unwrap() = Some(image_path.to_path_buf());

        if let Some(message) = &self.failure {
            return Err(ExtractError::Engine(message.clone()));
        }

        let path_text = image_path.to_string_lossy();
        let result = self
            .responses
            .iter()
            .find(|(key, _)| path_text.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_result.clone());

        Ok(result)
    }
}

/// A minimal one-question sheet: marker, answer indicator, and a value.
fn placeholder_result() -> ExtractionResult {
    let words = ["Q1.", "Answer:", "42"];
    let tokens: Vec<RecognizedToken> = words
        .iter()
        .enumerate()
        .map(|(i, text)| RecognizedToken {
            text: (*text).to_string(),
            confidence: 0.95,
            bbox: BoundingBox {
                x: 10 + i as u32 * 70,
                y: 10,
                width: 60,
                height: 20,
            },
            block: 1,
            paragraph: 1,
            line: 1,
            word: i as u32 + 1,
        })
        .collect();

    ExtractionResult {
        raw_text: words.join(" "),
        metadata: ExtractionMetadata {
            width: 800,
            height: 600,
            file_size_bytes: 1024,
            token_count: tokens.len(),
            mean_confidence: 0.95,
            engine: "mock".to_string(),
            elapsed_ms: 1,
        },
        tokens,
    }
}
