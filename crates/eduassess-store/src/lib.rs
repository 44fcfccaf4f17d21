//! Assessment-run persistence for EduAssess.
//!
//! Completed batch runs are saved through the [`AssessmentStore`] port:
//! - `MemoryStore`: in-memory fake for tests and ephemeral use
//! - `JsonFileStore`: a single JSON document on disk
//!
//! The port is narrow (save/list/get/delete plus an aggregate stats
//! view) so callers never depend on a concrete backend.

pub mod error;
pub mod jsonfile;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use eduassess_core::ScoredCandidate;

pub use error::StoreError;
pub use jsonfile::JsonFileStore;
pub use memory::MemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One persisted batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    /// Unique record id (UUID v4).
    pub id: String,

    /// The reference answer the run was scored against.
    pub reference_answer: String,

    /// All scored candidates of the run.
    pub results: Vec<ScoredCandidate>,

    /// When the run completed.
    pub created_at: DateTime<Utc>,

    /// Who ran the assessment.
    pub processed_by: String,

    /// Roster file the candidates came from, if any.
    pub source_file: Option<String>,
}

impl AssessmentRecord {
    /// Create a record for a just-completed run.
    pub fn new(
        reference_answer: impl Into<String>,
        results: Vec<ScoredCandidate>,
        processed_by: impl Into<String>,
        source_file: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reference_answer: reference_answer.into(),
            results,
            created_at: Utc::now(),
            processed_by: processed_by.into(),
            source_file,
        }
    }

    /// Number of passing candidates.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Number of failing candidates.
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    /// Mean score over all candidates, 0 when the run is empty.
    pub fn average_score(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.results.iter().map(|r| r.score as u32).sum();
        sum as f64 / self.results.len() as f64
    }

    /// Share of passing candidates as a percentage, 0 when empty.
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.passed_count() as f64 / self.results.len() as f64 * 100.0
    }
}

/// Aggregate view over all stored assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    /// Number of stored assessment runs.
    pub total_assessments: usize,

    /// Total student results across all runs.
    pub total_students: usize,

    /// Mean score over every stored result.
    pub average_score: f64,

    /// Share of passing results as a percentage.
    pub pass_rate: f64,
}

/// Assessment persistence port.
///
/// Guarantees:
/// - `save` never overwrites: record ids are unique per run.
/// - `list` returns records newest-first.
/// - `get`/`delete` fail with [`StoreError::NotFound`] for unknown ids.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Persist a completed run.
    async fn save(&self, record: &AssessmentRecord) -> StoreResult<()>;

    /// All stored runs, newest first.
    async fn list(&self) -> StoreResult<Vec<AssessmentRecord>>;

    /// One run by id.
    async fn get(&self, id: &str) -> StoreResult<AssessmentRecord>;

    /// Remove one run by id.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Aggregate stats over every stored run.
    async fn stats(&self) -> StoreResult<UserStats> {
        let records = self.list().await?;
        let total_assessments = records.len();
        let total_students: usize = records.iter().map(|r| r.results.len()).sum();
        let passed: usize = records.iter().map(|r| r.passed_count()).sum();
        let score_sum: u64 = records
            .iter()
            .flat_map(|r| r.results.iter())
            .map(|r| r.score as u64)
            .sum();

        let average_score = if total_students > 0 {
            score_sum as f64 / total_students as f64
        } else {
            0.0
        };
        let pass_rate = if total_students > 0 {
            passed as f64 / total_students as f64 * 100.0
        } else {
            0.0
        };

        Ok(UserStats {
            total_assessments,
            total_students,
            average_score,
            pass_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduassess_core::PASS_THRESHOLD;

    fn scored(name: &str, score: u8) -> ScoredCandidate {
        ScoredCandidate {
            name: name.to_string(),
            answer: "answer".to_string(),
            similarity: score,
            score,
            passed: score >= PASS_THRESHOLD,
            feedback: "fb".to_string(),
        }
    }

    #[test]
    fn test_record_aggregates() {
        let record = AssessmentRecord::new(
            "reference",
            vec![scored("Amy", 80), scored("Bob", 40), scored("Cal", 60)],
            "instructor",
            None,
        );

        assert_eq!(record.passed_count(), 2);
        assert_eq!(record.failed_count(), 1);
        assert!((record.average_score() - 60.0).abs() < f64::EPSILON);
        assert!((record.pass_rate() - 2.0 / 3.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_record_aggregates_are_zero() {
        let record = AssessmentRecord::new("reference", Vec::new(), "instructor", None);
        assert_eq!(record.average_score(), 0.0);
        assert_eq!(record.pass_rate(), 0.0);
    }

    #[test]
    fn test_record_ids_are_unique() {
        let a = AssessmentRecord::new("r", Vec::new(), "i", None);
        let b = AssessmentRecord::new("r", Vec::new(), "i", None);
        assert_ne!(a.id, b.id);
    }
}
