//! AI-backed semantic rubric matcher.
//!
//! Sends one grading prompt per question to an inference service and decodes
//! the reply as a strict verdict schema. Schema violations are rejected,
//! never coerced; transport failures surface as per-question errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gradescan_core::error::MatchError;
use gradescan_core::filter::{apply_confidence_filter, outcome_from_verdicts};
use gradescan_core::model::Rubric;
use gradescan_core::results::{MatchOutcome, RubricPointVerdict, VerdictStatus};
use gradescan_core::traits::{clean_model_response, extract_json_object, RubricMatcher};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Deterministic-leaning generation settings for grading.
const TEMPERATURE: f64 = 0.1;
const NUM_PREDICT: u32 = 2048;

const GRADING_INSTRUCTIONS: &str = r#"Judge every scoring point against the student response. Mark strictly: YES only when the point is clearly and correctly addressed, PARTIAL for incomplete or partially correct work, NO when it is absent or wrong. Confidence is your certainty in the verdict, from 0 to 1. Quote the student's own words as evidence for YES and PARTIAL; state what is missing for NO and PARTIAL.

Respond ONLY with a JSON object of exactly this shape, one rubric_analysis entry per scoring point, in order:
{
  "rubric_analysis": [
    {"rubric_point": "<point description>", "status": "YES", "confidence": 0.85, "evidence": "<quote or null>", "missing_content": "<text or null>", "marks_awarded": 2.0, "total_marks": 2.0}
  ],
  "overall_score": 0.75,
  "missed_marks_potential": 0.0,
  "summary": "<one sentence on the answer>",
  "analysis_notes": "<optional remarks>"
}"#;

/// Rubric matcher backed by an inference service.
pub struct SemanticMatcher {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    confidence_threshold: f64,
    client: reqwest::Client,
}

impl SemanticMatcher {
    pub fn new(endpoint: &str, model: &str) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            timeout,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            client: build_client(timeout),
        }
    }

    /// Send a bearer token with every request.
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("failed to build HTTP client")
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// The typed assessment the model must produce.
///
/// `overall_score` and `missed_marks_potential` are required on the wire but
/// recomputed locally from the verdicts after filtering.
#[derive(Debug, Deserialize)]
struct Assessment {
    rubric_analysis: Vec<WireVerdict>,
    #[allow(dead_code)]
    overall_score: f64,
    #[allow(dead_code)]
    missed_marks_potential: f64,
    summary: String,
}

#[derive(Debug, Deserialize)]
struct WireVerdict {
    rubric_point: String,
    status: String,
    confidence: f64,
    #[serde(default)]
    evidence: Option<String>,
    #[serde(default)]
    missing_content: Option<String>,
    #[serde(default)]
    marks_awarded: Option<f64>,
    #[serde(default)]
    total_marks: Option<f64>,
}

#[async_trait]
impl RubricMatcher for SemanticMatcher {
    fn name(&self) -> &str {
        "semantic"
    }

    #[instrument(skip(self, response_text, rubric), fields(question = rubric.question_number, model = %self.model))]
    async fn analyze(
        &self,
        response_text: &str,
        rubric: &Rubric,
    ) -> Result<MatchOutcome, MatchError> {
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: build_grading_prompt(response_text, rubric),
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: NUM_PREDICT,
            },
        };

        let mut request = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MatchError::Timeout(self.timeout.as_secs())
            } else if e.is_connect() {
                MatchError::Network(format!(
                    "inference service not reachable at {}: {e}",
                    self.endpoint
                ))
            } else {
                MatchError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(MatchError::AuthenticationFailed(body));
        }
        if status == 404 {
            return Err(MatchError::ModelNotFound(self.model.clone()));
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(MatchError::Api { status, message });
        }

        let envelope: GenerateResponse = response
            .json()
            .await
            .map_err(|e| MatchError::Parse(format!("malformed service envelope: {e}")))?;

        let assessment = parse_assessment(&envelope.response)?;
        let verdicts = verdicts_from_assessment(&assessment, rubric)?;

        let (surviving, filtering) = apply_confidence_filter(verdicts, self.confidence_threshold);
        Ok(outcome_from_verdicts(surviving, assessment.summary, filtering))
    }
}

/// Build the grading prompt for one question.
fn build_grading_prompt(response_text: &str, rubric: &Rubric) -> String {
    let scheme_json = serde_json::to_string_pretty(&rubric.marking_scheme)
        .unwrap_or_else(|_| "[]".to_string());
    let model_answer = rubric.model_answer.as_deref().unwrap_or("not provided");
    let keywords = if rubric.keywords.is_empty() {
        "none".to_string()
    } else {
        rubric.keywords.join(", ")
    };

    format!(
        "You are an experienced examiner marking one question of a handwritten answer sheet.\n\n\
         Question {number} (maximum {max} marks)\n\
         Model answer: {model_answer}\n\
         Question keywords: {keywords}\n\n\
         Scoring points (JSON):\n{scheme_json}\n\n\
         Student response:\n\"\"\"\n{response_text}\n\"\"\"\n\n\
         {GRADING_INSTRUCTIONS}",
        number = rubric.question_number,
        max = rubric.max_marks,
    )
}

/// Decode the model's reply into a typed assessment.
///
/// Fence markers are stripped first; if the cleaned text does not parse, one
/// retry parses the outermost brace-delimited substring. JSON-level failures
/// are `Parse`; a well-formed object with the wrong shape is a
/// `SchemaViolation`.
fn parse_assessment(reply: &str) -> Result<Assessment, MatchError> {
    let cleaned = clean_model_response(reply);

    let value: serde_json::Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(first_err) => {
            let object = extract_json_object(&cleaned).ok_or_else(|| {
                MatchError::Parse(format!("no JSON object in reply: {first_err}"))
            })?;
            serde_json::from_str(object).map_err(|e| MatchError::Parse(e.to_string()))?
        }
    };

    serde_json::from_value(value).map_err(|e| MatchError::SchemaViolation(e.to_string()))
}

/// Turn wire verdicts into validated [`RubricPointVerdict`]s.
///
/// Status casing and confidence bounds are enforced strictly. Marks absent
/// from the wire default from the scoring scheme by position: full marks for
/// YES, half for PARTIAL, zero for NO.
fn verdicts_from_assessment(
    assessment: &Assessment,
    rubric: &Rubric,
) -> Result<Vec<RubricPointVerdict>, MatchError> {
    if assessment.rubric_analysis.is_empty() {
        return Err(MatchError::EmptyResponse);
    }

    let mut verdicts = Vec::with_capacity(assessment.rubric_analysis.len());
    for (index, wire) in assessment.rubric_analysis.iter().enumerate() {
        let status: VerdictStatus = wire.status.parse().map_err(MatchError::SchemaViolation)?;

        if !(0.0..=1.0).contains(&wire.confidence) {
            return Err(MatchError::SchemaViolation(format!(
                "confidence {} outside [0, 1] for '{}'",
                wire.confidence, wire.rubric_point
            )));
        }

        let scheme_marks = rubric.marking_scheme.get(index).map(|p| p.marks);
        let total_marks = wire.total_marks.or(scheme_marks).unwrap_or(0.0);
        let marks_awarded = wire.marks_awarded.unwrap_or(match status {
            VerdictStatus::Yes => total_marks,
            VerdictStatus::Partial => total_marks * 0.5,
            VerdictStatus::No => 0.0,
        });

        if marks_awarded < 0.0 || marks_awarded > total_marks {
            return Err(MatchError::SchemaViolation(format!(
                "marks_awarded {marks_awarded} outside [0, {total_marks}] for '{}'",
                wire.rubric_point
            )));
        }

        verdicts.push(RubricPointVerdict {
            rubric_point: wire.rubric_point.clone(),
            status,
            confidence: wire.confidence,
            evidence: wire.evidence.clone(),
            missing_content: wire.missing_content.clone(),
            marks_awarded,
            total_marks,
        });
    }

    Ok(verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    use gradescan_core::model::ScoringPoint;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn point(id: &str, description: &str, marks: f64, keywords: &[&str]) -> ScoringPoint {
        ScoringPoint {
            id: id.into(),
            description: description.into(),
            marks,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn quadratic_rubric() -> Rubric {
        Rubric {
            question_number: 1,
            max_marks: 8.0,
            marking_scheme: vec![
                point(
                    "method_identification",
                    "Identifies factoring or the quadratic formula as the method",
                    2.0,
                    &["factoring", "quadratic formula", "complete square"],
                ),
                point(
                    "correct_factoring",
                    "Factors the quadratic as (x+2)(x+3)",
                    3.0,
                    &["(x+2)(x+3)", "factors"],
                ),
                point(
                    "final_solution",
                    "States both solutions x = -2 and x = -3",
                    2.0,
                    &["x = -2", "x = -3"],
                ),
                point(
                    "verification",
                    "Verifies the solutions by substitution",
                    1.0,
                    &["check", "verify", "substitute"],
                ),
            ],
            model_answer: Some("x^2 + 5x + 6 = (x+2)(x+3) = 0, so x = -2 or x = -3".into()),
            keywords: vec!["quadratic".into(), "factoring".into()],
            question_text: Some("Solve x^2 + 5x + 6 = 0".into()),
            subject: None,
            topic: None,
        }
    }

    fn full_assessment_json() -> String {
        serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "Identifies factoring or the quadratic formula as the method",
                 "status": "YES", "confidence": 0.9,
                 "evidence": "I will factor the quadratic", "missing_content": null,
                 "marks_awarded": 2.0, "total_marks": 2.0},
                {"rubric_point": "Factors the quadratic as (x+2)(x+3)",
                 "status": "YES", "confidence": 0.85,
                 "evidence": "(x+2)(x+3) = 0", "missing_content": null,
                 "marks_awarded": 3.0, "total_marks": 3.0},
                {"rubric_point": "States both solutions x = -2 and x = -3",
                 "status": "PARTIAL", "confidence": 0.8,
                 "evidence": "x = -2", "missing_content": "the second root x = -3",
                 "marks_awarded": 1.0, "total_marks": 2.0},
                {"rubric_point": "Verifies the solutions by substitution",
                 "status": "NO", "confidence": 0.9,
                 "evidence": null, "missing_content": "substitution check of both roots",
                 "marks_awarded": 0.0, "total_marks": 1.0}
            ],
            "overall_score": 0.75,
            "missed_marks_potential": 0.0,
            "summary": "Correct factoring, incomplete roots, no verification.",
            "analysis_notes": "handwriting is legible"
        })
        .to_string()
    }

    // --- pure parsing and validation ---

    #[test]
    fn parses_a_plain_assessment() {
        let assessment = parse_assessment(&full_assessment_json()).unwrap();
        assert_eq!(assessment.rubric_analysis.len(), 4);
        assert_eq!(
            assessment.summary,
            "Correct factoring, incomplete roots, no verification."
        );
    }

    #[test]
    fn parses_fenced_reply_with_prose() {
        let reply = format!(
            "Here is my assessment.\n```json\n{}\n```\nLet me know if anything is unclear.",
            full_assessment_json()
        );
        let assessment = parse_assessment(&reply).unwrap();
        assert_eq!(assessment.rubric_analysis.len(), 4);
    }

    #[test]
    fn non_json_reply_is_a_parse_error() {
        let err = parse_assessment("I cannot grade this response.").unwrap_err();
        assert!(matches!(err, MatchError::Parse(_)));
    }

    #[test]
    fn missing_summary_is_a_schema_violation() {
        let reply = serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "a", "status": "YES", "confidence": 0.9}
            ],
            "overall_score": 1.0,
            "missed_marks_potential": 0.0
        })
        .to_string();
        let err = parse_assessment(&reply).unwrap_err();
        match err {
            MatchError::SchemaViolation(message) => assert!(message.contains("summary")),
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let reply = serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "a", "status": "MAYBE", "confidence": 0.9}
            ],
            "overall_score": 0.5,
            "missed_marks_potential": 0.0,
            "summary": "s"
        })
        .to_string();
        let assessment = parse_assessment(&reply).unwrap();
        let err = verdicts_from_assessment(&assessment, &quadratic_rubric()).unwrap_err();
        assert!(matches!(err, MatchError::SchemaViolation(_)));
        assert!(err.is_schema());
    }

    #[test]
    fn lowercase_status_is_rejected() {
        let reply = serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "a", "status": "yes", "confidence": 0.9}
            ],
            "overall_score": 1.0,
            "missed_marks_potential": 0.0,
            "summary": "s"
        })
        .to_string();
        let assessment = parse_assessment(&reply).unwrap();
        assert!(verdicts_from_assessment(&assessment, &quadratic_rubric()).is_err());
    }

    #[test]
    fn out_of_range_confidence_is_rejected_not_coerced() {
        for confidence in [1.4, -0.1] {
            let reply = serde_json::json!({
                "rubric_analysis": [
                    {"rubric_point": "a", "status": "NO", "confidence": confidence}
                ],
                "overall_score": 0.0,
                "missed_marks_potential": 0.0,
                "summary": "s"
            })
            .to_string();
            let assessment = parse_assessment(&reply).unwrap();
            let err = verdicts_from_assessment(&assessment, &quadratic_rubric()).unwrap_err();
            match err {
                MatchError::SchemaViolation(message) => {
                    assert!(message.contains("confidence"));
                }
                other => panic!("expected SchemaViolation, got {other:?}"),
            }
        }
    }

    #[test]
    fn awarded_marks_above_total_are_rejected() {
        let reply = serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "a", "status": "YES", "confidence": 0.9,
                 "marks_awarded": 5.0, "total_marks": 3.0}
            ],
            "overall_score": 1.0,
            "missed_marks_potential": 0.0,
            "summary": "s"
        })
        .to_string();
        let assessment = parse_assessment(&reply).unwrap();
        let err = verdicts_from_assessment(&assessment, &quadratic_rubric()).unwrap_err();
        assert!(matches!(err, MatchError::SchemaViolation(_)));
    }

    #[test]
    fn empty_rubric_analysis_is_empty_response() {
        let reply = serde_json::json!({
            "rubric_analysis": [],
            "overall_score": 0.0,
            "missed_marks_potential": 0.0,
            "summary": "nothing to grade"
        })
        .to_string();
        let assessment = parse_assessment(&reply).unwrap();
        let err = verdicts_from_assessment(&assessment, &quadratic_rubric()).unwrap_err();
        assert!(matches!(err, MatchError::EmptyResponse));
    }

    #[test]
    fn missing_wire_marks_default_from_the_scheme() {
        let reply = serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "method", "status": "YES", "confidence": 0.9},
                {"rubric_point": "factoring", "status": "PARTIAL", "confidence": 0.8},
                {"rubric_point": "solution", "status": "NO", "confidence": 0.9}
            ],
            "overall_score": 0.5,
            "missed_marks_potential": 0.0,
            "summary": "s"
        })
        .to_string();
        let assessment = parse_assessment(&reply).unwrap();
        let verdicts = verdicts_from_assessment(&assessment, &quadratic_rubric()).unwrap();

        // Scheme marks by position: 2.0, 3.0, 2.0.
        assert_eq!(verdicts[0].marks_awarded, 2.0);
        assert_eq!(verdicts[0].total_marks, 2.0);
        assert_eq!(verdicts[1].marks_awarded, 1.5);
        assert_eq!(verdicts[1].total_marks, 3.0);
        assert_eq!(verdicts[2].marks_awarded, 0.0);
        assert_eq!(verdicts[2].total_marks, 2.0);
    }

    #[test]
    fn prompt_carries_rubric_and_response() {
        let prompt = build_grading_prompt("x = -2 and x = -3", &quadratic_rubric());
        assert!(prompt.contains("Question 1 (maximum 8 marks)"));
        assert!(prompt.contains("x = -2 and x = -3"));
        assert!(prompt.contains("method_identification"));
        assert!(prompt.contains("rubric_analysis"));
        assert!(prompt.contains("quadratic, factoring"));
    }

    // --- HTTP behavior against a mock service ---

    fn envelope(assessment: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "llama3.1:8b",
            "response": assessment,
            "done": true
        })
    }

    #[tokio::test]
    async fn successful_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&full_assessment_json())))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "llama3.1:8b");
        let outcome = matcher
            .analyze("I will factor the quadratic: (x+2)(x+3) = 0, x = -2", &quadratic_rubric())
            .await
            .unwrap();

        // All four verdicts clear the 0.7 threshold: (2 + 3 + 1 + 0) / 8.
        assert_eq!(outcome.verdicts.len(), 4);
        assert!((outcome.overall_score - 0.75).abs() < 1e-9);
        assert_eq!(outcome.missed_marks_potential, 0.0);
        assert_eq!(
            outcome.summary,
            "Correct factoring, incomplete roots, no verification."
        );
    }

    #[tokio::test]
    async fn uncertain_negative_becomes_missed_potential() {
        let assessment = serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "method", "status": "YES", "confidence": 0.9,
                 "marks_awarded": 2.0, "total_marks": 2.0},
                {"rubric_point": "verification", "status": "NO", "confidence": 0.3,
                 "marks_awarded": 0.0, "total_marks": 3.0}
            ],
            "overall_score": 0.4,
            "missed_marks_potential": 0.0,
            "summary": "uncertain about verification"
        })
        .to_string();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&assessment)))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "llama3.1:8b");
        let outcome = matcher
            .analyze("factored it", &quadratic_rubric())
            .await
            .unwrap();

        assert_eq!(outcome.verdicts.len(), 1);
        assert_eq!(outcome.overall_score, 1.0);
        assert!((outcome.missed_marks_potential - 3.0).abs() < 1e-9);
        assert_eq!(outcome.filtering.original_count, 2);
        assert_eq!(outcome.filtering.surviving_count, 1);
    }

    #[tokio::test]
    async fn schema_violation_in_reply_is_rejected() {
        let assessment = serde_json::json!({
            "rubric_analysis": [
                {"rubric_point": "method", "status": "YES", "confidence": 1.4}
            ],
            "overall_score": 1.0,
            "missed_marks_potential": 0.0,
            "summary": "overconfident"
        })
        .to_string();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&assessment)))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "llama3.1:8b");
        let err = matcher
            .analyze("anything", &quadratic_rubric())
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::SchemaViolation(_)));
        assert!(err.is_schema());
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "nonexistent");
        let err = matcher
            .analyze("anything", &quadratic_rubric())
            .await
            .unwrap_err();
        match err {
            MatchError::ModelNotFound(model) => assert_eq!(model, "nonexistent"),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "llama3.1:8b");
        let err = matcher
            .analyze("anything", &quadratic_rubric())
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn rate_limiting_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "llama3.1:8b");
        let err = matcher
            .analyze("anything", &quadratic_rubric())
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::Api { status: 429, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&full_assessment_json())))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "llama3.1:8b").with_api_key("test-key");
        let outcome = matcher
            .analyze("anything", &quadratic_rubric())
            .await
            .unwrap();
        assert_eq!(outcome.verdicts.len(), 4);
    }

    #[tokio::test]
    async fn malformed_envelope_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&server)
            .await;

        let matcher = SemanticMatcher::new(&server.uri(), "llama3.1:8b");
        let err = matcher
            .analyze("anything", &quadratic_rubric())
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::Parse(_)));
    }
}
