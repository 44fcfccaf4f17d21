//! JSON-file assessment store.
//!
//! Persists the full record list as one JSON document, rewritten on
//! every mutation. Single-writer semantics: the file is not locked, so
//! concurrent processes mutating the same path can lose updates.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::{AssessmentRecord, AssessmentStore, StoreResult};

/// File-backed store holding all records in one JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store at the given path. The file is created on first
    /// save; a missing file reads as an empty store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<Vec<AssessmentRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, records: &[AssessmentRecord]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&self.path, bytes).await?;
        debug!(records = records.len(), "persisted store to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl AssessmentStore for JsonFileStore {
    async fn save(&self, record: &AssessmentRecord) -> StoreResult<()> {
        let mut records = self.load().await?;
        records.push(record.clone());
        self.persist(&records).await
    }

    async fn list(&self) -> StoreResult<Vec<AssessmentRecord>> {
        let mut records = self.load().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn get(&self, id: &str) -> StoreResult<AssessmentRecord> {
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        self.persist(&records).await
    }
}
