//! Tesseract-backed text extraction.
//!
//! Runs the `tesseract` binary over a preprocessed copy of the sheet and
//! parses its TSV output into positioned word tokens. The binary is invoked
//! per page; no daemon or API bindings.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use gradescan_core::error::ExtractError;
use gradescan_core::model::{BoundingBox, ExtractionMetadata, ExtractionResult, RecognizedToken};
use gradescan_core::segmenter::correct_math_notation;
use gradescan_core::traits::TextExtractor;

use crate::preprocess::{preprocess_for_ocr, validate_and_load};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Words at or below this engine-reported confidence (0-100 scale) are
/// discarded as noise.
const MIN_TOKEN_CONFIDENCE: f64 = 30.0;

/// TSV `level` value for word rows. Lower levels describe page, block,
/// paragraph and line structure and carry no text of their own.
const WORD_LEVEL: u32 = 5;

/// OCR backend that shells out to the Tesseract binary.
pub struct TesseractExtractor {
    binary: PathBuf,
    timeout: Duration,
}

impl TesseractExtractor {
    /// Extractor using `tesseract` from `PATH` with the default timeout.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Use a specific Tesseract binary instead of searching `PATH`.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn extract(&self, image_path: &Path) -> Result<ExtractionResult, ExtractError> {
        let start = Instant::now();

        // The preprocessed page goes through a temp file; the handle stays
        // alive here so the file outlives the OCR run.
        let temp = tempfile::Builder::new()
            .prefix("gradescan-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractError::Engine(format!("creating temp page file: {e}")))?;
        let temp_path = temp.path().to_path_buf();

        let source = image_path.to_path_buf();
        let (width, height, file_size) = tokio::task::spawn_blocking(move || {
            let (img, file_size) = validate_and_load(&source)?;
            let page = preprocess_for_ocr(&img);
            let (width, height) = page.dimensions();
            page.save_with_format(&temp_path, image::ImageFormat::Png)
                .map_err(|e| ExtractError::Engine(format!("writing preprocessed page: {e}")))?;
            Ok::<_, ExtractError>((width, height, file_size))
        })
        .await
        .map_err(|_| ExtractError::Engine("preprocessing task panicked".into()))??;

        debug!(width, height, "page preprocessed for OCR");

        let mut cmd = Command::new(&self.binary);
        cmd.arg(temp.path())
            .arg("stdout")
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("6")
            .arg("tsv")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExtractError::Engine(format!(
                    "failed to run {}: {e}",
                    self.binary.display()
                )));
            }
            Err(_) => return Err(ExtractError::Timeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let tokens = parse_tsv(&tsv);
        let raw_text = assemble_text(&tokens);
        let mean_confidence = if tokens.is_empty() {
            0.0
        } else {
            tokens.iter().map(|t| t.confidence).sum::<f64>() / tokens.len() as f64
        };

        debug!(
            token_count = tokens.len(),
            mean_confidence, "tesseract run complete"
        );

        Ok(ExtractionResult {
            metadata: ExtractionMetadata {
                width,
                height,
                file_size_bytes: file_size,
                token_count: tokens.len(),
                mean_confidence,
                engine: self.name().to_string(),
                elapsed_ms: start.elapsed().as_millis() as u64,
            },
            raw_text,
            tokens,
        })
    }
}

/// Parse Tesseract TSV output into word tokens.
///
/// Keeps word rows (level 5) whose confidence is strictly above the noise
/// floor and whose text is non-empty after trimming. Malformed rows are
/// dropped rather than failing the page.
fn parse_tsv(tsv: &str) -> Vec<RecognizedToken> {
    let mut tokens = Vec::new();

    // Columns: level, page, block, par, line, word, left, top, width,
    // height, conf, text.
    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: u32 = fields[0].trim().parse().unwrap_or(0);
        if level != WORD_LEVEL {
            continue;
        }

        let confidence: f64 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if confidence <= MIN_TOKEN_CONFIDENCE || text.is_empty() {
            continue;
        }

        tokens.push(RecognizedToken {
            text: text.to_string(),
            confidence: confidence / 100.0,
            bbox: BoundingBox {
                x: fields[6].trim().parse().unwrap_or(0),
                y: fields[7].trim().parse().unwrap_or(0),
                width: fields[8].trim().parse().unwrap_or(0),
                height: fields[9].trim().parse().unwrap_or(0),
            },
            block: fields[2].trim().parse().unwrap_or(0),
            paragraph: fields[3].trim().parse().unwrap_or(0),
            line: fields[4].trim().parse().unwrap_or(0),
            word: fields[5].trim().parse().unwrap_or(0),
        });
    }

    tokens
}

/// Join token text in engine order and normalize math notation.
fn assemble_text(tokens: &[RecognizedToken]) -> String {
    let joined = tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    correct_math_notation(&joined)
}
