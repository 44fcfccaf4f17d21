//! Client for the external answer-evaluation service.
//!
//! Wraps a single call to a generative scoring endpoint: build the
//! grading prompt, send it with deterministic-leaning generation
//! settings, extract and sanitize the structured result. Every failure
//! mode degrades to the lexical fallback: [`ScoringClient::compare`]
//! always produces a result and never returns an error.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::batch::AnswerScorer;
use crate::domain::ComparisonResult;
use crate::error::ScoringError;
use crate::extract::{extract_json_object, parse_comparison};
use crate::fallback::lexical_score;

/// Default scoring endpoint (Gemini-style `generateContent`).
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";

/// Environment variable the API key is read from by default.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Scoring service configuration.
///
/// Passed explicitly into [`ScoringClient::new`]; there is no ambient
/// process-wide key or endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// API key sent as a query parameter.
    pub api_key: String,
    /// Full endpoint URL.
    pub endpoint: String,
    /// Sampling temperature. Kept low so repeated grading of similar
    /// answers stays stable.
    pub temperature: f32,
    /// Top-k sampling bound.
    pub top_k: u32,
    /// Nucleus sampling bound.
    pub top_p: f32,
    /// Output token budget for the grading object.
    pub max_output_tokens: u32,
    /// Per-call timeout. A timeout routes into the fallback like any
    /// other transport failure.
    #[serde(skip)]
    pub timeout: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.1,
            top_k: 32,
            top_p: 0.8,
            max_output_tokens: 512,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ScoringConfig {
    /// Build a config with the key taken from `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Override the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// Request/response envelope for the generateContent wire shape.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Client for one-pair answer comparison.
pub struct ScoringClient {
    config: ScoringConfig,
    http: reqwest::Client,
}

impl ScoringClient {
    /// Create a client from an explicit configuration.
    pub fn new(config: ScoringConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("eduassess/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, http }
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Self {
        Self::new(ScoringConfig::from_env())
    }

    /// The active configuration.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compare a candidate answer against the reference answer.
    ///
    /// Never fails: transport errors, bad statuses, malformed envelopes
    /// and unparseable model output all degrade to [`lexical_score`].
    /// Empty (post-trim) input on either side skips the network call and
    /// goes straight to the fallback, which yields a zero score for an
    /// empty candidate.
    ///
    /// Exactly one network attempt is made per call; the fallback is a
    /// substitute for a retry, not an addition to one.
    pub async fn compare(&self, reference: &str, candidate: &str) -> ComparisonResult {
        let reference = reference.trim();
        let candidate = candidate.trim();

        if reference.is_empty() || candidate.is_empty() {
            debug!("empty answer text, skipping AI call");
            return lexical_score(reference, candidate);
        }

        match self.evaluate(reference, candidate).await {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, "AI scoring failed, using lexical fallback");
                lexical_score(reference, candidate)
            }
        }
    }

    /// The fallible primary path: one POST, envelope decode, extraction.
    async fn evaluate(
        &self,
        reference: &str,
        candidate: &str,
    ) -> Result<ComparisonResult, ScoringError> {
        let prompt = build_prompt(reference, candidate);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let url = format!("{}?key={}", self.config.endpoint, self.config.api_key);
        let response = self.http.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Status {
                status: status.as_u16(),
            });
        }

        let envelope: GenerateResponse = response.json().await?;
        let text = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(ScoringError::MalformedResponse)?;

        debug!(chars = text.len(), "received model output");

        let json = extract_json_object(&text).ok_or(ScoringError::MissingJson)?;
        parse_comparison(&json)
    }
}

#[async_trait]
impl AnswerScorer for ScoringClient {
    async fn compare(&self, reference: &str, candidate: &str) -> ComparisonResult {
        ScoringClient::compare(self, reference, candidate).await
    }
}

/// Build the grading prompt for one (reference, candidate) pair.
fn build_prompt(reference: &str, candidate: &str) -> String {
    format!(
        r#"You are an expert educational assessment AI. Compare the student answer with the correct answer.

CORRECT ANSWER:
{reference}

STUDENT ANSWER:
{candidate}

Analyze the student's answer and provide a JSON response with these exact fields:
- similarity: A number from 0-100 representing how conceptually similar the answers are
- feedback: Brief constructive feedback (under 150 characters)
- score: A number from 0-100 representing the overall quality and accuracy
- passed: true if score >= 60, false otherwise

Consider:
1. Conceptual understanding and accuracy
2. Completeness of the answer
3. Use of correct terminology
4. Overall clarity and coherence

Respond with ONLY valid JSON in this format:
{{"similarity": 85, "feedback": "Good understanding, but missing key details about...", "score": 78, "passed": true}}"#
    )
}
