//! Layout segmentation: turning recognized tokens into per-question segments.
//!
//! Works in four steps: detect question-number markers on reading lines,
//! resolve each question's vertical boundary, assign every line to its
//! nearest question, then split each segment into stem and response text.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SegmentError;
use crate::model::{
    ExtractionResult, PatternKind, PositionRange, QuestionCandidate, QuestionSegment,
    RecognizedToken,
};

/// Question numbers outside this range are treated as OCR noise.
pub const MIN_QUESTION_NUMBER: u32 = 1;
pub const MAX_QUESTION_NUMBER: u32 = 50;

/// Confidence boost for a marker found at the start of a line.
const EARLY_MATCH_BOOST: f64 = 0.05;
const EARLY_MATCH_WINDOW: usize = 10;

/// Marker patterns in priority order, each with its confidence prior.
///
/// Compiled case-insensitively, so the `[A-Z]` in the numbered-list pattern
/// admits any letter.
const MARKER_PATTERNS: &[(PatternKind, &str, f64)] = &[
    (PatternKind::QPrefix, r"Q\.?\s*(\d+)\.?", 0.95),
    (PatternKind::QuestionWord, r"Question\s+(\d+)\.?", 0.90),
    (PatternKind::NumberWord, r"No\.?\s*(\d+)", 0.88),
    (PatternKind::NumberedList, r"^\s*(\d+)\.?\s*[A-Z]", 0.85),
    (PatternKind::AnswerPrefix, r"Ans\.?\s*(\d+)", 0.82),
    (PatternKind::Parenthesized, r"\(\s*(\d+)\s*\)", 0.80),
    (PatternKind::Bracketed, r"(\d+)\s*\)", 0.75),
    (PatternKind::ColonDash, r"^\s*(\d+)\s*[:-]", 0.70),
];

/// Phrases that mark where a student's working starts, in priority order.
/// The split lands on the first occurrence of the first pattern that hits.
const ANSWER_INDICATORS: &[&str] = &[
    r"(?:solution|answer|ans|solve|solving)[:.]?\s*",
    r"(?:given|substituting|using|applying)[:.]?\s*",
    r"(?:step\s*\d+|method|procedure)[:.]?\s*",
    r"(?:therefore|hence|thus|so)[:.]?\s*",
];

/// Fixed substitutions for common mathematical-notation misreads.
///
/// Deliberately conservative: symbols only, never alphanumerics, since
/// letter/digit swaps corrupt ordinary prose more often than they repair
/// an equation.
const MATH_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("×", "*"),
    ("÷", "/"),
    ("−", "-"),
    ("≤", "<="),
    ("≥", ">="),
    ("≠", "!="),
    ("√", "sqrt"),
    ("²", "^2"),
    ("³", "^3"),
];

/// Replace misrecognized mathematical symbols with ASCII spellings.
pub fn correct_math_notation(text: &str) -> String {
    let mut out = text.to_string();
    for (from, to) in MATH_SUBSTITUTIONS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

/// Advisory diagnostics over the detected question-number sequence.
///
/// Never blocks an analysis; surfaced to operators through
/// `SheetResult.metadata` and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceReport {
    pub is_valid: bool,
    pub question_count: usize,
    pub range: Option<String>,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Check a detected question-number sequence for suspicious shapes.
///
/// `numbers` is the raw detection list in reading order, duplicates
/// included, so repeated markers can be reported.
pub fn validate_sequence(numbers: &[u32]) -> SequenceReport {
    if numbers.is_empty() {
        return SequenceReport {
            is_valid: false,
            question_count: 0,
            range: None,
            issues: vec!["No questions detected".to_string()],
            suggestions: vec!["Check if the image contains clear question numbers".to_string()],
        };
    }

    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    let first = sorted[0];
    let last = sorted[sorted.len() - 1];

    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    let missing: Vec<u32> = (first..=last).filter(|n| !sorted.contains(n)).collect();
    if !missing.is_empty() {
        issues.push(format!("Missing question numbers: {missing:?}"));
        suggestions.push("Check if some questions were not detected by OCR".to_string());
    }

    let mut duplicates: Vec<u32> = sorted
        .iter()
        .copied()
        .filter(|n| sorted.iter().filter(|m| *m == n).count() > 1)
        .collect();
    duplicates.dedup();
    if !duplicates.is_empty() {
        issues.push(format!("Duplicate question numbers: {duplicates:?}"));
        suggestions.push("Review OCR results for duplicate detections".to_string());
    }

    if first > 10 {
        issues.push(format!("First question number is {first} (unusually high)"));
        suggestions.push("Verify that question numbering starts from beginning".to_string());
    }

    if sorted.len() > 50 {
        issues.push(format!("Too many questions detected: {}", sorted.len()));
        suggestions.push("Check for false positive detections".to_string());
    }

    for pair in sorted.windows(2) {
        if pair[1] - pair[0] > 5 {
            issues.push(format!("Large gap between Q{} and Q{}", pair[0], pair[1]));
            suggestions.push("Verify all questions in sequence are present".to_string());
        }
    }

    SequenceReport {
        is_valid: issues.is_empty(),
        question_count: sorted.len(),
        range: Some(format!("{first} to {last}")),
        issues,
        suggestions,
    }
}

/// A segmentation pass over one sheet: the per-question segments plus the
/// advisory sequence diagnostics produced along the way.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub segments: BTreeMap<u32, QuestionSegment>,
    pub sequence: SequenceReport,
}

/// One reading line reassembled from tokens, with its vertical extent and
/// the best question marker found on it (if any).
struct ReadingLine {
    text: String,
    start_y: u32,
    end_y: u32,
    marker: Option<QuestionCandidate>,
}

struct MarkerPattern {
    kind: PatternKind,
    prior: f64,
    regex: Regex,
}

/// Splits recognized tokens into per-question segments.
pub struct QuestionSegmenter {
    markers: Vec<MarkerPattern>,
    answer_indicators: Vec<Regex>,
    operator_spacing: Regex,
}

impl QuestionSegmenter {
    pub fn new() -> Self {
        let markers = MARKER_PATTERNS
            .iter()
            .map(|(kind, pattern, prior)| MarkerPattern {
                kind: *kind,
                prior: *prior,
                regex: RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .multi_line(true)
                    .build()
                    .expect("valid marker pattern"),
            })
            .collect();
        let answer_indicators = ANSWER_INDICATORS
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .expect("valid answer indicator pattern")
            })
            .collect();
        let operator_spacing =
            Regex::new(r"\s*([=+\-*/^<>])\s*").expect("valid operator spacing pattern");
        Self {
            markers,
            answer_indicators,
            operator_spacing,
        }
    }

    /// Segment an extraction into per-question text blocks.
    ///
    /// Fails with [`SegmentError::NoSegments`] only when no marker is
    /// detected at all or when every assembled segment is empty.
    pub fn segment(&self, extraction: &ExtractionResult) -> Result<Segmentation, SegmentError> {
        let lines = self.build_lines(&extraction.tokens);
        let candidates: Vec<&QuestionCandidate> =
            lines.iter().filter_map(|l| l.marker.as_ref()).collect();
        if candidates.is_empty() {
            return Err(SegmentError::NoSegments {
                token_count: extraction.tokens.len(),
            });
        }

        let numbers: Vec<u32> = candidates.iter().map(|c| c.question_number).collect();
        let sequence = validate_sequence(&numbers);
        if !sequence.is_valid {
            debug!(issues = ?sequence.issues, "question sequence has anomalies");
        }

        // Highest-confidence candidate per number, and the minimum y at
        // which each number's marker was seen.
        let mut best: BTreeMap<u32, &QuestionCandidate> = BTreeMap::new();
        let mut boundaries: BTreeMap<u32, u32> = BTreeMap::new();
        for candidate in &candidates {
            let number = candidate.question_number;
            match best.get(&number) {
                Some(current) if current.confidence >= candidate.confidence => {}
                _ => {
                    best.insert(number, candidate);
                }
            }
            let entry = boundaries.entry(number).or_insert(candidate.position);
            if candidate.position < *entry {
                *entry = candidate.position;
            }
        }

        // Top-to-bottom assignment: marker lines switch to their own
        // question, continuation lines follow the nearest boundary.
        let mut assigned: BTreeMap<u32, Vec<&ReadingLine>> = BTreeMap::new();
        for line in &lines {
            let number = match &line.marker {
                Some(candidate) if boundaries.contains_key(&candidate.question_number) => {
                    candidate.question_number
                }
                _ => nearest_boundary(line.start_y, &boundaries),
            };
            assigned.entry(number).or_default().push(line);
        }

        let mut segments = BTreeMap::new();
        for (number, members) in assigned {
            let combined = members
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let full_text = self.normalize_text(&combined);
            if full_text.is_empty() {
                debug!(question = number, "dropping empty segment");
                continue;
            }
            let (stem_text, response_text) = self.split_stem_response(&full_text, number);
            let start_y = members.iter().map(|l| l.start_y).min().unwrap_or(0);
            let end_y = members.iter().map(|l| l.end_y).max().unwrap_or(start_y);
            let marker_confidence = best.get(&number).map(|c| c.confidence).unwrap_or(0.0);
            segments.insert(
                number,
                QuestionSegment {
                    question_number: number,
                    stem_text,
                    response_text,
                    full_text,
                    position: PositionRange { start_y, end_y },
                    marker_confidence,
                },
            );
        }

        if segments.is_empty() {
            return Err(SegmentError::NoSegments {
                token_count: extraction.tokens.len(),
            });
        }
        Ok(Segmentation { segments, sequence })
    }

    /// Detect question-marker candidates, one at most per reading line.
    pub fn detect_candidates(&self, extraction: &ExtractionResult) -> Vec<QuestionCandidate> {
        self.build_lines(&extraction.tokens)
            .into_iter()
            .filter_map(|l| l.marker)
            .collect()
    }

    /// Collapse whitespace, fix math notation, and space out operators.
    pub fn normalize_text(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let corrected = correct_math_notation(&collapsed);
        let spaced = self.operator_spacing.replace_all(&corrected, " ${1} ");
        spaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Split a segment's text into question stem and student response.
    ///
    /// The split point is the first occurrence of the highest-priority
    /// answer indicator present; the indicator itself belongs to the
    /// response. Falls back to the first sentence boundary, then to
    /// treating the whole text as the response under a placeholder stem.
    /// The response side is never left empty.
    fn split_stem_response(&self, text: &str, question_number: u32) -> (String, String) {
        for indicator in &self.answer_indicators {
            if let Some(m) = indicator.find(text) {
                let response = text[m.start()..].trim();
                if !response.is_empty() {
                    return (text[..m.start()].trim().to_string(), response.to_string());
                }
            }
        }

        if let Some(idx) = text.find(['.', '!', '?']) {
            let response = text[idx + 1..].trim();
            if !response.is_empty() {
                return (text[..idx].trim().to_string(), response.to_string());
            }
        }

        (format!("Question {question_number}"), text.to_string())
    }

    /// Regroup tokens into reading lines ordered top-to-bottom, scanning
    /// each line for its best question marker.
    fn build_lines(&self, tokens: &[RecognizedToken]) -> Vec<ReadingLine> {
        let mut grouped: BTreeMap<(u32, u32, u32), Vec<&RecognizedToken>> = BTreeMap::new();
        for token in tokens {
            if token.text.trim().is_empty() {
                continue;
            }
            grouped
                .entry((token.block, token.paragraph, token.line))
                .or_default()
                .push(token);
        }

        let mut lines: Vec<ReadingLine> = grouped
            .into_values()
            .map(|mut members| {
                members.sort_by_key(|t| t.bbox.x);
                let text = members
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let start_y = members.iter().map(|t| t.bbox.y).min().unwrap_or(0);
                let end_y = members.iter().map(|t| t.bbox.bottom()).max().unwrap_or(start_y);
                let marker = self.scan_line(&text, start_y);
                ReadingLine {
                    text,
                    start_y,
                    end_y,
                    marker,
                }
            })
            .collect();
        lines.sort_by_key(|l| l.start_y);
        lines
    }

    /// Find the best-scoring marker match on one line, if any.
    fn scan_line(&self, text: &str, line_y: u32) -> Option<QuestionCandidate> {
        let mut best: Option<QuestionCandidate> = None;
        for marker in &self.markers {
            let Some(captures) = marker.regex.captures(text) else {
                continue;
            };
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let number: u32 = match captures.get(1).and_then(|g| g.as_str().parse().ok()) {
                Some(n) => n,
                None => continue,
            };
            if !(MIN_QUESTION_NUMBER..=MAX_QUESTION_NUMBER).contains(&number) {
                continue;
            }
            let mut confidence = marker.prior;
            if whole.start() < EARLY_MATCH_WINDOW {
                confidence += EARLY_MATCH_BOOST;
            }
            if best.as_ref().map_or(true, |b| confidence > b.confidence) {
                best = Some(QuestionCandidate {
                    question_number: number,
                    pattern: marker.kind,
                    confidence,
                    position: line_y,
                    matched_text: whole.as_str().to_string(),
                    source_text: text.to_string(),
                });
            }
        }
        best
    }
}

impl Default for QuestionSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Question number whose boundary lies closest to `y`; ties go to the
/// lower question number.
fn nearest_boundary(y: u32, boundaries: &BTreeMap<u32, u32>) -> u32 {
    let mut nearest = 0;
    let mut nearest_distance = u32::MAX;
    for (number, boundary) in boundaries {
        let distance = y.abs_diff(*boundary);
        if distance < nearest_distance {
            nearest_distance = distance;
            nearest = *number;
        }
    }
    nearest
}
