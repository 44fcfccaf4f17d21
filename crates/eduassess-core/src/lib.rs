//! EduAssess core: answer comparison and batch scoring.
//!
//! Provides the two cooperating pieces of the assessment pipeline:
//! - [`ScoringClient`] wraps a single call to an external generative
//!   evaluation service and degrades to a deterministic lexical
//!   fallback on any failure
//! - [`BatchScorer`] drives a scorer over an ordered candidate roster,
//!   sequentially, with pacing, progress reporting and cooperative
//!   cancellation

pub mod batch;
pub mod client;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod telemetry;

// Re-export key types
pub use batch::{AnswerScorer, BatchScorer, CancelToken, DEFAULT_PACING};
pub use client::{ScoringClient, ScoringConfig, API_KEY_ENV, DEFAULT_ENDPOINT};
pub use domain::{
    sort_results, BatchProgress, Candidate, ComparisonResult, ScoredCandidate, SortKey, SortOrder,
    PASS_THRESHOLD,
};
pub use error::ScoringError;
pub use fallback::{lexical_score, LexicalScorer};
pub use telemetry::init_tracing;
