//! Rubric parsing and validation.
//!
//! Rubrics arrive as a JSON array or a TOML `[[rubrics]]` set. On the wire
//! the marking scheme is a map keyed by point id; internally it becomes an
//! ordered `Vec<ScoringPoint>` (alphabetical by id) so downstream output is
//! deterministic.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::model::{Rubric, ScoringPoint};

/// Marking scheme totals may differ from `max_marks` by at most this much.
pub const MARKS_TOLERANCE: f64 = 0.01;

/// Intermediate TOML structure for rubric set files.
#[derive(Debug, Deserialize)]
struct RubricSetFile {
    rubrics: Vec<RubricEntry>,
}

/// Wire shape of one rubric; the marking scheme is keyed by point id.
#[derive(Debug, Deserialize)]
struct RubricEntry {
    question_number: u32,
    max_marks: f64,
    marking_scheme: BTreeMap<String, SchemePointEntry>,
    #[serde(default)]
    model_answer: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    question_text: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    topic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SchemePointEntry {
    description: String,
    marks: f64,
    #[serde(default)]
    keywords: Vec<String>,
}

impl RubricEntry {
    fn into_rubric(self) -> Rubric {
        let marking_scheme = self
            .marking_scheme
            .into_iter()
            .map(|(id, point)| ScoringPoint {
                id,
                description: point.description,
                marks: point.marks,
                keywords: point.keywords,
            })
            .collect();

        Rubric {
            question_number: self.question_number,
            max_marks: self.max_marks,
            marking_scheme,
            model_answer: self.model_answer,
            keywords: self.keywords,
            question_text: self.question_text,
            subject: self.subject,
            topic: self.topic,
        }
    }
}

/// Load rubrics from a `.json` or `.toml` file, dispatching on extension.
pub fn load_rubrics(path: &Path) -> Result<Vec<Rubric>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rubric file: {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => parse_rubrics_json(&content)
            .with_context(|| format!("invalid JSON rubrics: {}", path.display())),
        "toml" => parse_rubrics_toml(&content)
            .with_context(|| format!("invalid TOML rubrics: {}", path.display())),
        other => anyhow::bail!("unsupported rubric format '{other}' (expected .json or .toml)"),
    }
}

/// Parse a JSON array of rubrics (useful for testing).
pub fn parse_rubrics_json(content: &str) -> Result<Vec<Rubric>> {
    let entries: Vec<RubricEntry> = serde_json::from_str(content)?;
    Ok(entries.into_iter().map(RubricEntry::into_rubric).collect())
}

/// Parse a TOML document with `[[rubrics]]` tables.
pub fn parse_rubrics_toml(content: &str) -> Result<Vec<Rubric>> {
    let file: RubricSetFile = toml::from_str(content)?;
    Ok(file
        .rubrics
        .into_iter()
        .map(RubricEntry::into_rubric)
        .collect())
}

/// Validate a rubric set, collecting every violation before reporting.
///
/// An invalid set rejects the whole analysis request; partial acceptance
/// would silently change what `total_questions` means.
pub fn validate_rubrics(rubrics: &[Rubric]) -> Result<(), ValidationError> {
    let mut messages = Vec::new();

    if rubrics.is_empty() {
        messages.push("at least one rubric is required".to_string());
    }

    for (index, rubric) in rubrics.iter().enumerate() {
        let label = format!("rubric {} (question {})", index, rubric.question_number);

        if rubric.max_marks <= 0.0 {
            messages.push(format!("{label}: max_marks must be positive"));
        }

        if rubric.marking_scheme.is_empty() {
            messages.push(format!("{label}: marking scheme must not be empty"));
            continue;
        }

        let mut scheme_total = 0.0;
        for point in &rubric.marking_scheme {
            if point.marks < 0.0 {
                messages.push(format!(
                    "{label}: marks for point '{}' cannot be negative",
                    point.id
                ));
            }
            scheme_total += point.marks;
        }

        if (scheme_total - rubric.max_marks).abs() > MARKS_TOLERANCE {
            messages.push(format!(
                "{label}: total marking scheme marks ({scheme_total}) don't match max_marks ({})",
                rubric.max_marks
            ));
        }
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(messages))
    }
}
