//! Core data model for assessment runs.
//!
//! These types flow through the whole pipeline: the roster collaborator
//! produces [`Candidate`]s, the scoring client produces a
//! [`ComparisonResult`] per candidate, and the batch scorer merges the two
//! into [`ScoredCandidate`]s handed back to the caller.

use serde::{Deserialize, Serialize};

/// Score at or above which an answer counts as passing.
pub const PASS_THRESHOLD: u8 = 60;

/// One student's submitted answer.
///
/// Both fields are non-empty after roster-side filtering; the order in
/// which candidates are delivered is the initial ordering of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Student name as it appeared in the roster.
    pub name: String,

    /// The submitted answer text.
    pub answer: String,
}

impl Candidate {
    pub fn new(name: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answer: answer.into(),
        }
    }
}

/// Outcome of comparing one candidate answer against the reference.
///
/// Every result, whether produced by the AI path or the lexical
/// fallback, has been through sanitization: `similarity` and `score` are
/// clamped to 0–100, `feedback` is at most 200 characters, and
/// `passed == (score >= PASS_THRESHOLD)` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Conceptual closeness to the reference answer, 0–100.
    pub similarity: u8,

    /// Short constructive feedback for the student.
    pub feedback: String,

    /// Overall quality/correctness grade, 0–100.
    pub score: u8,

    /// Whether the score meets the pass threshold.
    pub passed: bool,
}

impl ComparisonResult {
    /// All-zero result recorded when a candidate could not be scored at
    /// all and needs a human look.
    pub fn review_required() -> Self {
        Self {
            similarity: 0,
            feedback: "Error processing answer - please review manually".to_string(),
            score: 0,
            passed: false,
        }
    }
}

/// A candidate merged with its comparison result.
///
/// Created once per candidate per batch run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Student name, copied verbatim from the input candidate.
    pub name: String,

    /// Submitted answer, copied verbatim from the input candidate.
    pub answer: String,

    /// Conceptual similarity to the reference, 0–100.
    pub similarity: u8,

    /// Overall grade, 0–100.
    pub score: u8,

    /// Whether the grade meets the pass threshold.
    pub passed: bool,

    /// Feedback text (AI-generated or fallback template).
    pub feedback: String,
}

impl ScoredCandidate {
    /// Merge a candidate with its scoring outcome.
    pub fn from_parts(candidate: &Candidate, result: ComparisonResult) -> Self {
        Self {
            name: candidate.name.clone(),
            answer: candidate.answer.clone(),
            similarity: result.similarity,
            score: result.score,
            passed: result.passed,
            feedback: result.feedback,
        }
    }
}

/// Transient progress snapshot emitted after each candidate completes.
///
/// Not persisted; consumed only by the progress callback of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Candidates scored so far (including the one just finished).
    pub completed: usize,

    /// Total candidates in this run.
    pub total: usize,

    /// Name of the candidate that just finished scoring.
    pub current_name: String,
}

impl BatchProgress {
    /// Completion percentage in `[0, 100]`.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// Key to order a result list by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Case-insensitive student name (the default initial ordering).
    #[default]
    Name,
    /// Numeric overall score.
    Score,
    /// Numeric similarity.
    Similarity,
}

/// Direction to order a result list in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Sort scored candidates in place.
///
/// The sort is stable: candidates that compare equal on the key keep
/// their relative input order. Name comparison is case-insensitive.
pub fn sort_results(results: &mut [ScoredCandidate], key: SortKey, order: SortOrder) {
    results.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Score => a.score.cmp(&b.score),
            SortKey::Similarity => a.similarity.cmp(&b.similarity),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(name: &str, score: u8, similarity: u8) -> ScoredCandidate {
        ScoredCandidate {
            name: name.to_string(),
            answer: "answer".to_string(),
            similarity,
            score,
            passed: score >= PASS_THRESHOLD,
            feedback: String::new(),
        }
    }

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let mut results = vec![scored("bob", 10, 10), scored("Alice", 20, 20)];
        sort_results(&mut results, SortKey::Name, SortOrder::Asc);
        assert_eq!(results[0].name, "Alice");
        assert_eq!(results[1].name, "bob");

        sort_results(&mut results, SortKey::Name, SortOrder::Desc);
        assert_eq!(results[0].name, "bob");
    }

    #[test]
    fn test_sort_by_score_keeps_ties_in_input_order() {
        let mut results = vec![
            scored("Zoe", 70, 50),
            scored("Amy", 70, 60),
            scored("Mia", 40, 30),
        ];
        sort_results(&mut results, SortKey::Score, SortOrder::Asc);
        assert_eq!(results[0].name, "Mia");
        // Tied scores: Zoe came first in the input and stays first.
        assert_eq!(results[1].name, "Zoe");
        assert_eq!(results[2].name, "Amy");
    }

    #[test]
    fn test_sort_desc_reverses_key_not_ties() {
        let mut results = vec![scored("Zoe", 70, 50), scored("Amy", 70, 60)];
        sort_results(&mut results, SortKey::Score, SortOrder::Desc);
        assert_eq!(results[0].name, "Zoe");
        assert_eq!(results[1].name, "Amy");
    }

    #[test]
    fn test_progress_percent() {
        let progress = BatchProgress {
            completed: 2,
            total: 5,
            current_name: "Amy".to_string(),
        };
        assert!((progress.percent() - 40.0).abs() < f64::EPSILON);

        let done = BatchProgress {
            completed: 5,
            total: 5,
            current_name: "Zoe".to_string(),
        };
        assert!((done.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_review_required_is_zeroed_and_failed() {
        let result = ComparisonResult::review_required();
        assert_eq!(result.score, 0);
        assert_eq!(result.similarity, 0);
        assert!(!result.passed);
        assert!(result.feedback.contains("review manually"));
    }
}
