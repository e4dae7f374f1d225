//! Local persistence collaborator.
//!
//! Implementations:
//! - `InMemoryStore` - For testing
//! - `DiskStore` (in plot-sync-daemon) - JSON files under the cache dir
//!
//! The store holds two things per project: the durable snapshot cache that
//! makes edits survive remote failures, and the crash-recovery session
//! marker. The marker has two write paths with one representation: the
//! async writer used during normal operation, and a blocking writer for
//! forced process teardown where async completion cannot be awaited. The
//! blocking path is best effort and may be stale when observed later.

use crate::recovery::RecoverySession;
use crate::snapshot::ProjectSnapshot;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable local cache keyed by project id, plus session-marker primitives.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Persist a snapshot to the local cache, replacing any previous copy.
    async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<()>;

    /// Load the cached snapshot, or `None` if the project was never cached.
    async fn load_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>>;

    /// Remove the cached snapshot.
    async fn clear_project_cache(&self, project_id: &str) -> Result<()>;

    /// Write the session liveness marker (normal operation path).
    async fn write_session_marker(&self, session: &RecoverySession) -> Result<()>;

    /// Write the session liveness marker without suspending.
    ///
    /// Used at forced process teardown where async completion cannot be
    /// guaranteed. Must produce the same marker representation as the async
    /// writer.
    fn write_session_marker_blocking(&self, session: &RecoverySession) -> Result<()>;

    /// Read back the session marker for a project, if one exists.
    async fn load_session_marker(&self, project_id: &str) -> Result<Option<RecoverySession>>;

    /// Remove the session marker.
    async fn clear_session_marker(&self, project_id: &str) -> Result<()>;
}

/// In-memory store for testing.
///
/// Tracks call counts so debounce tests can assert "exactly one persist per
/// window".
pub struct InMemoryStore {
    projects: RwLock<HashMap<String, ProjectSnapshot>>,
    markers: RwLock<HashMap<String, RecoverySession>>,
    save_count: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            markers: RwLock::new(HashMap::new()),
            save_count: AtomicUsize::new(0),
        }
    }

    /// Number of `save_project` calls so far.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::Relaxed)
    }

    /// Peek at the cached snapshot without going through the trait.
    pub fn cached(&self, project_id: &str) -> Option<ProjectSnapshot> {
        self.projects.read().unwrap().get(project_id).cloned()
    }

    /// Peek at the session marker without going through the trait.
    pub fn marker(&self, project_id: &str) -> Option<RecoverySession> {
        self.markers.read().unwrap().get(project_id).cloned()
    }

    /// Seed a cached snapshot, bypassing the save counter.
    pub fn seed_project(&self, snapshot: ProjectSnapshot) {
        self.projects
            .write()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
    }

    /// Seed a session marker, as if left behind by a previous process.
    pub fn seed_marker(&self, session: RecoverySession) {
        self.markers
            .write()
            .unwrap()
            .insert(session.project_id.clone(), session);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for InMemoryStore {
    async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<()> {
        self.save_count.fetch_add(1, Ordering::Relaxed);
        self.projects
            .write()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        Ok(self.projects.read().unwrap().get(project_id).cloned())
    }

    async fn clear_project_cache(&self, project_id: &str) -> Result<()> {
        self.projects.write().unwrap().remove(project_id);
        Ok(())
    }

    async fn write_session_marker(&self, session: &RecoverySession) -> Result<()> {
        self.write_session_marker_blocking(session)
    }

    fn write_session_marker_blocking(&self, session: &RecoverySession) -> Result<()> {
        self.markers
            .write()
            .unwrap()
            .insert(session.project_id.clone(), session.clone());
        Ok(())
    }

    async fn load_session_marker(&self, project_id: &str) -> Result<Option<RecoverySession>> {
        Ok(self.markers.read().unwrap().get(project_id).cloned())
    }

    async fn clear_session_marker(&self, project_id: &str) -> Result<()> {
        self.markers.write().unwrap().remove(project_id);
        Ok(())
    }
}

// Implement LocalStore for Arc<T> where T: LocalStore
// This allows sharing a store between the engine and test assertions
#[async_trait]
impl<T: LocalStore> LocalStore for std::sync::Arc<T> {
    async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<()> {
        (**self).save_project(snapshot).await
    }

    async fn load_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        (**self).load_project(project_id).await
    }

    async fn clear_project_cache(&self, project_id: &str) -> Result<()> {
        (**self).clear_project_cache(project_id).await
    }

    async fn write_session_marker(&self, session: &RecoverySession) -> Result<()> {
        (**self).write_session_marker(session).await
    }

    fn write_session_marker_blocking(&self, session: &RecoverySession) -> Result<()> {
        (**self).write_session_marker_blocking(session)
    }

    async fn load_session_marker(&self, project_id: &str) -> Result<Option<RecoverySession>> {
        (**self).load_session_marker(project_id).await
    }

    async fn clear_session_marker(&self, project_id: &str) -> Result<()> {
        (**self).clear_session_marker(project_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = InMemoryStore::new();
        let snap = ProjectSnapshot::new_empty("p1", "Plot", 1000);

        store.save_project(&snap).await.unwrap();
        let loaded = store.load_project("p1").await.unwrap();
        assert_eq!(loaded, Some(snap));

        assert!(store.load_project("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_project_cache() {
        let store = InMemoryStore::new();
        store
            .save_project(&ProjectSnapshot::new_empty("p1", "Plot", 1000))
            .await
            .unwrap();

        store.clear_project_cache("p1").await.unwrap();
        assert!(store.load_project("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_count_tracks_persist_calls() {
        let store = InMemoryStore::new();
        let snap = ProjectSnapshot::new_empty("p1", "Plot", 1000);

        assert_eq!(store.save_count(), 0);
        store.save_project(&snap).await.unwrap();
        store.save_project(&snap).await.unwrap();
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_marker_writers_share_representation() {
        let store = InMemoryStore::new();
        let session = RecoverySession {
            project_id: "p1".to_string(),
            last_active_at: 5000,
            clean_shutdown: false,
        };

        // Blocking write, async read
        store.write_session_marker_blocking(&session).unwrap();
        let read_back = store.load_session_marker("p1").await.unwrap();
        assert_eq!(read_back, Some(session.clone()));

        // Async write overwrites the same marker
        let clean = RecoverySession {
            clean_shutdown: true,
            ..session
        };
        store.write_session_marker(&clean).await.unwrap();
        let read_back = store.load_session_marker("p1").await.unwrap();
        assert!(read_back.unwrap().clean_shutdown);
    }
}
