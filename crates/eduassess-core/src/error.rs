//! Error types for the scoring pipeline.

use thiserror::Error;

/// Failures on the primary AI scoring path.
///
/// These never cross [`ScoringClient::compare`](crate::ScoringClient::compare):
/// every variant is converted into a lexical fallback result instead of
/// being surfaced to the batch loop.
#[derive(Error, Debug)]
pub enum ScoringError {
    /// Network/transport failure, including per-call timeout.
    #[error("request to scoring service failed: {0}")]
    Transport(String),

    /// Service answered with a non-success HTTP status.
    #[error("scoring service returned HTTP {status}")]
    Status { status: u16 },

    /// Response envelope is missing the candidate content.
    #[error("scoring response missing candidate content")]
    MalformedResponse,

    /// Model output contained no JSON object.
    #[error("no JSON object found in model output")]
    MissingJson,

    /// Model output contained a JSON-looking fragment that failed to parse.
    #[error("failed to parse model output as JSON: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ScoringError {
    fn from(err: reqwest::Error) -> Self {
        ScoringError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ScoringError {
    fn from(err: serde_json::Error) -> Self {
        ScoringError::Parse(err.to_string())
    }
}
