//! Mock matcher for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use gradescan_core::error::MatchError;
use gradescan_core::filter::{apply_confidence_filter, outcome_from_verdicts};
use gradescan_core::model::Rubric;
use gradescan_core::results::{MatchOutcome, RubricPointVerdict, VerdictStatus};
use gradescan_core::traits::RubricMatcher;

/// A mock rubric matcher for exercising callers without an inference service.
///
/// Returns configurable outcomes based on response-text content matching.
pub struct MockMatcher {
    /// Map of response-text substring → canned outcome.
    responses: HashMap<String, MatchOutcome>,
    /// Default outcome if no substring matches.
    default_outcome: MatchOutcome,
    /// Error message to fail every call with, when set.
    failure: Option<String>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last (response text, question number) received.
    last_request: Mutex<Option<(String, u32)>>,
}

impl MockMatcher {
    /// Create a mock with the given response-text→outcome mappings.
    pub fn new(responses: HashMap<String, MatchOutcome>) -> Self {
        Self {
            responses,
            default_outcome: placeholder_outcome(),
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same outcome.
    pub fn with_fixed_outcome(outcome: MatchOutcome) -> Self {
        Self {
            responses: HashMap::new(),
            default_outcome: outcome,
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock whose every call fails with a network error.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: HashMap::new(),
            default_outcome: placeholder_outcome(),
            failure: Some(message.to_string()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this matcher.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last response text and question number analyzed.
    pub fn last_request(&self) -> Option<(String, u32)> {
        self.last_request.lock().unwrap().clone()
    }
}

/// One confident full-marks verdict, so callers see realistic numbers.
fn placeholder_outcome() -> MatchOutcome {
    let verdicts = vec![RubricPointVerdict {
        rubric_point: "placeholder point".into(),
        status: VerdictStatus::Yes,
        confidence: 0.9,
        evidence: Some("Found: placeholder".into()),
        missing_content: None,
        marks_awarded: 2.0,
        total_marks: 2.0,
    }];
    let (surviving, filtering) = apply_confidence_filter(verdicts, 0.7);
    outcome_from_verdicts(surviving, "mock assessment".into(), filtering)
}

#[async_trait]
impl RubricMatcher for MockMatcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(
        &self,
        response_text: &str,
        rubric: &Rubric,
    ) -> Result<MatchOutcome, MatchError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() =
            Some((response_text.to_string(), rubric.question_number));

        if let Some(message) = &self.failure {
            return Err(MatchError::Network(message.clone()));
        }

        let outcome = self
            .responses
            .iter()
            .find(|(key, _)| response_text.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_outcome.clone());

        Ok(outcome)
    }
}
