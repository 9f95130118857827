//! Caller-owned memoization keyed by snapshot identity.
//!
//! The engine itself never caches. A caller that wants to reuse statistics or
//! queues computes a [`SnapshotKey`] over the exact inputs (question set plus
//! `now` floored to a coarse bucket) and keeps results in its own
//! [`SnapshotCache`].

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};
use crate::types::QuestionRecord;

/// SHA-256 fingerprint of a question set at a bucketed instant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotKey(String);

impl SnapshotKey {
    /// Fingerprint `questions` as seen at `now`, with `now` floored to
    /// `bucket`. Any change to an identity, score or timestamp changes the
    /// key; two instants within the same bucket share it.
    pub fn compute(
        questions: &[QuestionRecord],
        now: DateTime<Utc>,
        bucket: Duration,
    ) -> EngineResult<Self> {
        let bucket_ms = bucket.num_milliseconds();
        if bucket_ms <= 0 {
            return Err(EngineError::Validation(
                "snapshot bucket must be a positive duration".to_string(),
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(now.timestamp_millis().div_euclid(bucket_ms).to_le_bytes());
        hasher.update((questions.len() as u64).to_le_bytes());
        for record in questions {
            for part in [
                record.id.owner_id.as_bytes(),
                record.id.subject.as_bytes(),
                record.id.week.as_bytes(),
            ] {
                hasher.update((part.len() as u64).to_le_bytes());
                hasher.update(part);
            }
            hasher.update(record.id.index.to_le_bytes());
            hasher.update((record.history.len() as u64).to_le_bytes());
            for attempt in record.history.iter() {
                hasher.update(attempt.score.to_bits().to_le_bytes());
                hasher.update(attempt.answered_at.timestamp_millis().to_le_bytes());
            }
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounded map from snapshot key to a computed value.
///
/// When full, the oldest inserted entry is evicted.
#[derive(Debug, Clone)]
pub struct SnapshotCache<V> {
    capacity: usize,
    entries: HashMap<SnapshotKey, V>,
    order: VecDeque<SnapshotKey>,
}

impl<V> SnapshotCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &SnapshotKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: SnapshotKey, value: V) {
        if self.entries.insert(key.clone(), value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Cached value for `key`, computing and storing it on a miss.
    ///
    /// A failed computation stores nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: SnapshotKey,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        if !self.entries.contains_key(&key) {
            let value = compute()?;
            self.insert(key.clone(), value);
        }
        Ok(&self.entries[&key])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
