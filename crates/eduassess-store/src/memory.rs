//! In-memory assessment store (testing and ephemeral use).

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::{AssessmentRecord, AssessmentStore, StoreResult};

/// In-memory store backed by a `Mutex<Vec<AssessmentRecord>>`.
///
/// Satisfies the full [`AssessmentStore`] contract without touching the
/// filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AssessmentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn save(&self, record: &AssessmentRecord) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<AssessmentRecord>> {
        let records = self.records.lock().unwrap();
        let mut all = records.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn get(&self, id: &str) -> StoreResult<AssessmentRecord> {
        let records = self.records.lock().unwrap();
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}
