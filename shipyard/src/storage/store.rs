//! In-memory deployment record store

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::deployment::{DeploymentRecord, DeploymentStatus};

/// Shared handle to one record.
///
/// The lock serializes transitions of that record; records never share a lock.
pub type RecordHandle = Arc<RwLock<DeploymentRecord>>;

/// Read access to a record, recovering from poisoning
pub fn read_record(handle: &RecordHandle) -> RwLockReadGuard<'_, DeploymentRecord> {
    handle.read().unwrap_or_else(|e| e.into_inner())
}

/// Write access to a record, recovering from poisoning
pub fn write_record(handle: &RecordHandle) -> RwLockWriteGuard<'_, DeploymentRecord> {
    handle.write().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct Index {
    records: HashMap<String, RecordHandle>,
    /// Deployment ids per project, in creation order
    by_project: HashMap<String, Vec<String>>,
}

/// Deployment record store
#[derive(Default)]
pub struct DeploymentStore {
    index: RwLock<Index>,
}

impl DeploymentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read_index(&self) -> RwLockReadGuard<'_, Index> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, Index> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a new record and return its handle
    pub fn insert(&self, record: DeploymentRecord) -> RecordHandle {
        let handle = Arc::new(RwLock::new(record));
        self.insert_handle(handle.clone());
        handle
    }

    /// Index a record created outside the store
    pub fn insert_handle(&self, handle: RecordHandle) {
        let (id, project_id) = {
            let record = read_record(&handle);
            (record.id.clone(), record.project_id.clone())
        };

        let mut index = self.write_index();
        index.records.insert(id.clone(), handle);
        index.by_project.entry(project_id).or_default().push(id);
    }

    /// Get a record handle by deployment id
    pub fn get(&self, deployment_id: &str) -> Option<RecordHandle> {
        self.read_index().records.get(deployment_id).cloned()
    }

    /// Get a record handle, only if it belongs to `project_id`
    pub fn get_for_project(&self, project_id: &str, deployment_id: &str) -> Option<RecordHandle> {
        self.get(deployment_id)
            .filter(|handle| read_record(handle).project_id == project_id)
    }

    /// Snapshot of a record
    pub fn snapshot(&self, deployment_id: &str) -> Option<DeploymentRecord> {
        self.get(deployment_id).map(|handle| read_record(&handle).clone())
    }

    /// Handle of the most recently created record of a project
    pub fn latest(&self, project_id: &str) -> Option<RecordHandle> {
        let index = self.read_index();
        index
            .by_project
            .get(project_id)
            .and_then(|ids| ids.last())
            .and_then(|id| index.records.get(id))
            .cloned()
    }

    /// Up to `limit` most recent records of a project, newest first
    pub fn history(&self, project_id: &str, limit: usize) -> Vec<DeploymentRecord> {
        self.newest_first(project_id)
            .into_iter()
            .take(limit)
            .map(|handle| read_record(&handle).clone())
            .collect()
    }

    /// Most recently created record of a project with the given status
    pub fn latest_with_status(
        &self,
        project_id: &str,
        status: DeploymentStatus,
    ) -> Option<DeploymentRecord> {
        self.newest_first(project_id).into_iter().find_map(|handle| {
            let record = read_record(&handle);
            (record.status == status).then(|| record.clone())
        })
    }

    /// Number of records of a project
    pub fn count(&self, project_id: &str) -> usize {
        self.read_index()
            .by_project
            .get(project_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Handles of a project's records, newest first.
    ///
    /// Record locks are taken only after the index lock is released.
    fn newest_first(&self, project_id: &str) -> Vec<RecordHandle> {
        let index = self.read_index();
        index
            .by_project
            .get(project_id)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .filter_map(|id| index.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
