//! Dispatch state persistence
//!
//! Two things outlive a dispatch: the per-subject "already teased" marker,
//! and the outcome recorded for every credential that was published to or
//! failed. Skipped credentials leave no record.
//!
//! - [`MemoryStore`]: process-local, for tests and hosts without storage
//! - [`Database`]: SQLite through `sqlx`, migrated on open

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::{CredentialKey, DispatchOutcome};

pub mod sqlite;

pub use sqlite::Database;

/// One persisted outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResult {
    pub subject_id: String,
    pub key: CredentialKey,
    /// "published" or "failed"
    pub status: String,
    /// Response body of a successful publish
    pub response: Option<Value>,
    /// `PublishError::kind()` of a failed publish
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    /// Unix timestamp (seconds)
    pub recorded_at: i64,
}

impl RecordedResult {
    /// Build the record for `outcome`; `None` for skipped outcomes
    pub fn from_outcome(
        subject_id: &str,
        key: &CredentialKey,
        outcome: &DispatchOutcome,
        recorded_at: i64,
    ) -> Option<Self> {
        let (response, error_kind, error_message) = match outcome {
            DispatchOutcome::Published(response) => (Some(response.body.clone()), None, None),
            DispatchOutcome::Failed(error) => {
                (None, Some(error.kind().to_string()), Some(error.to_string()))
            }
            DispatchOutcome::Skipped(_) => return None,
        };

        Some(Self {
            subject_id: subject_id.to_string(),
            key: key.clone(),
            status: outcome.status_str().to_string(),
            response,
            error_kind,
            error_message,
            recorded_at,
        })
    }

    pub fn is_published(&self) -> bool {
        self.status == "published"
    }
}

/// Persistence the dispatcher needs.
#[async_trait]
pub trait TeaserStore: Send + Sync {
    /// Whether `subject_id` was already dispatched
    async fn get_marker(&self, subject_id: &str) -> Result<bool>;

    /// Mark `subject_id` dispatched; returns `false` if it already was
    async fn set_marker(&self, subject_id: &str) -> Result<bool>;

    /// Persist one outcome. Skipped outcomes are accepted and ignored.
    async fn record_result(
        &self,
        subject_id: &str,
        key: &CredentialKey,
        outcome: &DispatchOutcome,
    ) -> Result<()>;

    /// Recorded outcomes for `subject_id`, oldest first
    async fn results_for(&self, subject_id: &str) -> Result<Vec<RecordedResult>>;
}

#[derive(Default)]
struct MemoryState {
    markers: HashSet<String>,
    results: HashMap<String, Vec<RecordedResult>>,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TeaserStore for MemoryStore {
    async fn get_marker(&self, subject_id: &str) -> Result<bool> {
        Ok(self.state().markers.contains(subject_id))
    }

    async fn set_marker(&self, subject_id: &str) -> Result<bool> {
        Ok(self.state().markers.insert(subject_id.to_string()))
    }

    async fn record_result(
        &self,
        subject_id: &str,
        key: &CredentialKey,
        outcome: &DispatchOutcome,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        if let Some(record) = RecordedResult::from_outcome(subject_id, key, outcome, now) {
            self.state()
                .results
                .entry(subject_id.to_string())
                .or_default()
                .push(record);
        }
        Ok(())
    }

    async fn results_for(&self, subject_id: &str) -> Result<Vec<RecordedResult>> {
        Ok(self
            .state()
            .results
            .get(subject_id)
            .cloned()
            .unwrap_or_default())
    }
}
