//! Core data model types for gradescan.
//!
//! These are the fundamental types the entire gradescan system uses to
//! represent OCR output, detected questions, and marking rubrics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel-space bounding box of one OCR detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Bottom edge of the box.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// One recognized word from the OCR engine.
///
/// Immutable once produced; the extractor owns creation, the segmenter only
/// reads. Confidence is normalized to 0.0–1.0 (the engine's 0–100 scale
/// divided by 100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedToken {
    /// Recognized text, already trimmed. Never empty.
    pub text: String,
    /// Recognition confidence in 0.0–1.0.
    pub confidence: f64,
    /// Where on the page the text was seen.
    pub bbox: BoundingBox,
    /// Page block index from the engine's layout analysis.
    pub block: u32,
    /// Paragraph index within the block.
    pub paragraph: u32,
    /// Line index within the paragraph.
    pub line: u32,
    /// Word index within the line.
    pub word: u32,
}

/// Metadata describing one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Source image width in pixels.
    pub width: u32,
    /// Source image height in pixels.
    pub height: u32,
    /// Source file size in bytes.
    pub file_size_bytes: u64,
    /// Tokens surviving the confidence floor.
    pub token_count: usize,
    /// Mean confidence across surviving tokens (0 when empty).
    pub mean_confidence: f64,
    /// Identifier of the OCR engine that produced the tokens.
    #[serde(default)]
    pub engine: String,
    /// Wall-clock extraction time.
    #[serde(default)]
    pub elapsed_ms: u64,
}

/// Output of the image extractor: tokens with layout, plus the concatenated
/// corrected text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub tokens: Vec<RecognizedToken>,
    /// All token text joined in reading order, math notation corrected.
    pub raw_text: String,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Regroups tokens into reading lines: ordered by (block, paragraph,
    /// line), words within a line ordered by x.
    pub fn lines(&self) -> Vec<String> {
        let mut by_line: std::collections::BTreeMap<(u32, u32, u32), Vec<&RecognizedToken>> =
            std::collections::BTreeMap::new();
        for token in &self.tokens {
            by_line
                .entry((token.block, token.paragraph, token.line))
                .or_default()
                .push(token);
        }

        let mut lines = Vec::with_capacity(by_line.len());
        for (_, mut words) in by_line {
            words.sort_by_key(|t| t.bbox.x);
            let text = words
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            if !text.trim().is_empty() {
                lines.push(text);
            }
        }
        lines
    }
}

/// Which marker rule detected a question number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// `Q1.`, `Q.1`, `Q 1`
    QPrefix,
    /// `Question 1`
    QuestionWord,
    /// `No.1`, `No 1`
    NumberWord,
    /// `1. Answer` — leading digit followed by a capitalized word
    NumberedList,
    /// `Ans.1`, `Ans 1`
    AnswerPrefix,
    /// `(1)`
    Parenthesized,
    /// `1)`
    Bracketed,
    /// `1:`, `2-`
    ColonDash,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternKind::QPrefix => "q_prefix",
            PatternKind::QuestionWord => "question_word",
            PatternKind::NumberWord => "number_word",
            PatternKind::NumberedList => "numbered_list",
            PatternKind::AnswerPrefix => "answer_prefix",
            PatternKind::Parenthesized => "parenthesized",
            PatternKind::Bracketed => "bracketed",
            PatternKind::ColonDash => "colon_dash",
        };
        write!(f, "{name}")
    }
}

/// A detected question-number marker, before per-number deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionCandidate {
    /// The parsed question number (kept within 1–50).
    pub question_number: u32,
    /// Which detection rule matched.
    pub pattern: PatternKind,
    /// Rule prior, plus the start-of-line boost when it applies.
    pub confidence: f64,
    /// Vertical position of the token carrying the marker.
    pub position: u32,
    /// The exact text the rule matched.
    pub matched_text: String,
    /// Full text of the token the marker was found in.
    pub source_text: String,
}

/// Vertical extent of a question's tokens on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRange {
    pub start_y: u32,
    pub end_y: u32,
}

/// The contiguous text attributed to one question, split into a stem
/// (the printed question) and the student's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSegment {
    pub question_number: u32,
    /// The question portion. May be a synthesized placeholder, never the
    /// whole text.
    pub stem_text: String,
    /// The answer portion. Never empty for a surviving segment.
    pub response_text: String,
    /// Complete normalized text of the segment.
    pub full_text: String,
    pub position: PositionRange,
    /// Confidence of the marker candidate that anchored this segment.
    pub marker_confidence: f64,
}

/// One gradable criterion within a rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPoint {
    /// Stable identifier of the point within its rubric.
    pub id: String,
    /// What the answer must cover to earn the marks.
    pub description: String,
    /// Marks allocated to this point. Non-negative.
    pub marks: f64,
    /// Keywords whose presence is evidence for this point.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// The marking rubric for one question. Supplied by the caller and never
/// mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    pub question_number: u32,
    /// Maximum marks for the question. The scheme's marks sum to this
    /// within a 0.01 tolerance.
    pub max_marks: f64,
    /// Ordered scoring points.
    pub marking_scheme: Vec<ScoringPoint>,
    /// Reference answer shown to the semantic matcher.
    #[serde(default)]
    pub model_answer: Option<String>,
    /// Question-level keywords, shown to the matcher alongside per-point ones.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Original question text, carried for display only.
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl Rubric {
    /// Sum of marks across the scoring points.
    pub fn scheme_marks(&self) -> f64 {
        self.marking_scheme.iter().map(|p| p.marks).sum()
    }
}
