//! Sequential batch scoring over a candidate roster.
//!
//! Drives an [`AnswerScorer`] over an ordered candidate list one at a
//! time, never concurrently, with a fixed pacing delay between calls
//! to stay under the scoring service's rate limit. Every candidate
//! yields exactly one [`ScoredCandidate`]; a scorer that degrades
//! internally still produces a row, and even a panicking scorer only
//! costs that one candidate its real score.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::domain::{
    sort_results, BatchProgress, Candidate, ComparisonResult, ScoredCandidate, SortKey, SortOrder,
};

/// Default pacing delay between consecutive scoring calls.
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

/// Scoring seam used by [`BatchScorer`].
///
/// Implementations must be infallible: degrade to a fallback result
/// rather than returning an error. [`crate::ScoringClient`] and
/// [`crate::LexicalScorer`] both satisfy this.
#[async_trait]
pub trait AnswerScorer: Send + Sync {
    /// Produce a comparison result for one (reference, candidate) pair.
    async fn compare(&self, reference: &str, candidate: &str) -> ComparisonResult;
}

/// Cooperative cancellation flag checked between candidates.
///
/// Cloning shares the flag. A batch never stops mid-candidate; a
/// triggered token takes effect before the next scoring call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Sequential batch driver.
pub struct BatchScorer {
    scorer: Arc<dyn AnswerScorer>,
    pacing: Duration,
    sort_key: SortKey,
    sort_order: SortOrder,
    cancel: CancelToken,
}

impl BatchScorer {
    /// Create a batch scorer with default pacing (2 s) and the default
    /// result ordering (name, ascending, case-insensitive).
    pub fn new(scorer: Arc<dyn AnswerScorer>) -> Self {
        Self {
            scorer,
            pacing: DEFAULT_PACING,
            sort_key: SortKey::default(),
            sort_order: SortOrder::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Override the pacing delay between consecutive scoring calls.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Choose the final ordering of the result list.
    pub fn with_sort(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort_key = key;
        self.sort_order = order;
        self
    }

    /// Token that cancels this scorer's runs when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Score every candidate against the reference answer, in input
    /// order, invoking `on_progress` after each candidate completes.
    ///
    /// Guarantees (for an uncancelled run):
    /// - exactly one output row per input candidate, in no case fewer;
    /// - row `i` carries candidate `i`'s name and answer verbatim;
    /// - progress percentages are non-decreasing and end at 100;
    /// - the only reordering is the final explicit sort.
    ///
    /// A cancelled run stops before the next scoring call and returns
    /// the rows completed so far, sorted the same way.
    pub async fn score_batch(
        &self,
        reference: &str,
        candidates: &[Candidate],
        mut on_progress: impl FnMut(BatchProgress),
    ) -> Vec<ScoredCandidate> {
        let total = candidates.len();
        let mut results: Vec<ScoredCandidate> = Vec::with_capacity(total);

        info!(total, "starting batch scoring run");

        for (index, candidate) in candidates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(
                    completed = results.len(),
                    total, "batch cancelled, returning partial results"
                );
                break;
            }

            // Rate-limit pacing between consecutive calls.
            if index > 0 {
                tokio::time::sleep(self.pacing).await;
            }

            debug!(student = %candidate.name, position = index + 1, total, "scoring candidate");

            let result = match AssertUnwindSafe(self.scorer.compare(reference, &candidate.answer))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(student = %candidate.name, "scorer panicked, recording zero result");
                    ComparisonResult::review_required()
                }
            };

            results.push(ScoredCandidate::from_parts(candidate, result));

            on_progress(BatchProgress {
                completed: results.len(),
                total,
                current_name: candidate.name.clone(),
            });
        }

        sort_results(&mut results, self.sort_key, self.sort_order);
        results
    }
}
