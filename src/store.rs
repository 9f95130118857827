//! Versioned history storage seam.
//!
//! The engine never persists anything. Orchestration code loads a history
//! through [`HistoryStore`], asks the engine for the appended history, and
//! writes it back with a compare-and-swap on the version it read, so two
//! concurrent submissions against one question can never silently drop an
//! attempt.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::EngineError;
use crate::types::{QuestionHistory, QuestionId, QuestionRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("version conflict for {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: QuestionId,
        expected: u64,
        found: u64,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Raised by `HistoryStore` implementations over real storage; the
    /// in-memory store never fails this way.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A history together with the version it was read at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionedHistory {
    pub version: u64,
    pub history: QuestionHistory,
}

pub trait HistoryStore {
    /// Current history for `id`; unknown questions read as empty at version 0.
    fn load(&self, id: &QuestionId) -> Result<VersionedHistory, StoreError>;

    /// Replace the history if the stored version still equals
    /// `expected_version`. Returns the new version.
    fn compare_and_swap(
        &self,
        id: &QuestionId,
        expected_version: u64,
        history: QuestionHistory,
    ) -> Result<u64, StoreError>;
}

/// In-process store, mostly for tests and the snapshot CLI.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<HashMap<QuestionId, VersionedHistory>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = QuestionRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| {
                (
                    record.id,
                    VersionedHistory {
                        version: 1,
                        history: record.history,
                    },
                )
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// All stored questions, ordered by identity.
    pub fn records(&self) -> Vec<QuestionRecord> {
        let entries = self.entries.read();
        let mut records: Vec<QuestionRecord> = entries
            .iter()
            .map(|(id, versioned)| QuestionRecord::new(id.clone(), versioned.history.clone()))
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self, id: &QuestionId) -> Result<VersionedHistory, StoreError> {
        Ok(self.entries.read().get(id).cloned().unwrap_or_default())
    }

    fn compare_and_swap(
        &self,
        id: &QuestionId,
        expected_version: u64,
        history: QuestionHistory,
    ) -> Result<u64, StoreError> {
        let mut entries = self.entries.write();
        let found = entries.get(id).map_or(0, |v| v.version);
        if found != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.clone(),
                expected: expected_version,
                found,
            });
        }
        let version = found + 1;
        entries.insert(id.clone(), VersionedHistory { version, history });
        Ok(version)
    }
}
