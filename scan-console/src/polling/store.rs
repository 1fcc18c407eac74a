//! Latest known status per tracked task.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::status::{TaskProgress, TaskStatus};

/// Last polled state of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    pub id: i64,
    pub progress: TaskProgress,
    pub updated_at: DateTime<Utc>,
}

impl TrackedEntity {
    pub fn status(&self) -> TaskStatus {
        self.progress.status
    }
}

/// Concurrent map of task id to its last polled state.
///
/// Readers see whole entries; only the polling scheduler writes.
#[derive(Debug, Default)]
pub struct EntityStateStore {
    entities: DashMap<i64, TrackedEntity>,
}

impl EntityStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<TrackedEntity> {
        self.entities.get(&id).map(|e| e.value().clone())
    }

    pub fn status(&self, id: i64) -> Option<TaskStatus> {
        self.entities.get(&id).map(|e| e.status())
    }

    /// All entries, ordered by id.
    pub fn snapshot(&self) -> Vec<TrackedEntity> {
        let mut entries: Vec<_> = self.entities.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn remove(&self, id: i64) -> Option<TrackedEntity> {
        self.entities.remove(&id).map(|(_, e)| e)
    }

    pub(crate) fn update(&self, id: i64, progress: TaskProgress) {
        self.entities.insert(
            id,
            TrackedEntity {
                id,
                progress,
                updated_at: Utc::now(),
            },
        );
    }
}
