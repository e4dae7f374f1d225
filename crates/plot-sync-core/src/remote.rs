//! Remote sync collaborator.
//!
//! The remote project server exposes fetch/replace-whole-document semantics
//! with server-assigned version numbers:
//! - fetch returns the authoritative snapshot, or `None` when the project
//!   has never been created remotely (a not-found response is success with
//!   server version 0, not an error)
//! - put replaces the whole document and returns the updated snapshot with
//!   a server-assigned incremented version
//!
//! Implementations:
//! - `InMemoryRemote` - For testing, with failure injection
//! - `HttpRemote` (in plot-sync-daemon) - REST over reqwest

use crate::snapshot::{LayerSet, ProjectMetadata, ProjectSnapshot, VenueConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Server returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Body of a replace-whole-document request.
///
/// Carries the editor-owned content only; version numbers are assigned by
/// the server on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPayload {
    pub name: String,
    pub venue: VenueConfig,
    pub scale: String,
    pub layers: LayerSet,
    pub metadata: ProjectMetadata,
}

impl ProjectPayload {
    /// Payload for the current state of a snapshot.
    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            venue: snapshot.venue.clone(),
            scale: snapshot.scale.clone(),
            layers: snapshot.layers.clone(),
            metadata: snapshot.metadata.clone(),
        }
    }
}

/// Network boundary to the authoritative remote store.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch the authoritative snapshot. `None` means the project does not
    /// exist remotely yet; transport and server failures are errors.
    async fn fetch_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>>;

    /// Replace the whole remote document. Returns the updated snapshot with
    /// the server-assigned version.
    async fn put_project(&self, project_id: &str, payload: &ProjectPayload) -> Result<ProjectSnapshot>;
}

/// In-memory remote for testing.
///
/// Acts as the authoritative store: every accepted put increments the
/// server version. `fail_next_puts` injects push failures to exercise the
/// retry path.
pub struct InMemoryRemote {
    projects: RwLock<HashMap<String, ProjectSnapshot>>,
    fail_next_puts: AtomicU32,
    put_count: AtomicUsize,
    fetch_count: AtomicUsize,
    /// Fake server clock, bumped on every accepted write.
    server_clock: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            fail_next_puts: AtomicU32::new(0),
            put_count: AtomicUsize::new(0),
            fetch_count: AtomicUsize::new(0),
            server_clock: AtomicUsize::new(1_000_000),
        }
    }

    /// Make the next `n` put attempts fail with a 503.
    pub fn fail_next_puts(&self, n: u32) {
        self.fail_next_puts.store(n, Ordering::Relaxed);
    }

    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::Relaxed)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Peek at the authoritative copy.
    pub fn stored(&self, project_id: &str) -> Option<ProjectSnapshot> {
        self.projects.read().unwrap().get(project_id).cloned()
    }

    /// Install a remote snapshot directly, as if another client pushed it.
    pub fn seed_project(&self, snapshot: ProjectSnapshot) {
        self.projects
            .write()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
    }

    fn tick_clock(&self) -> u64 {
        self.server_clock.fetch_add(1, Ordering::Relaxed) as u64
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteClient for InMemoryRemote {
    async fn fetch_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.projects.read().unwrap().get(project_id).cloned())
    }

    async fn put_project(&self, project_id: &str, payload: &ProjectPayload) -> Result<ProjectSnapshot> {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let pending = self.fail_next_puts.load(Ordering::Relaxed);
        if pending > 0 {
            self.fail_next_puts.store(pending - 1, Ordering::Relaxed);
            return Err(RemoteError::Http {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        let now = self.tick_clock();
        let mut projects = self.projects.write().unwrap();
        let (version, created_at) = match projects.get(project_id) {
            Some(existing) => (existing.version + 1, existing.created_at),
            None => (1, now),
        };

        let updated = ProjectSnapshot {
            id: project_id.to_string(),
            name: payload.name.clone(),
            venue: payload.venue.clone(),
            scale: payload.scale.clone(),
            layers: payload.layers.clone(),
            metadata: payload.metadata.clone(),
            version,
            created_at,
            updated_at: now,
        };
        projects.insert(project_id.to_string(), updated.clone());
        Ok(updated)
    }
}

// Implement RemoteClient for Arc<T> where T: RemoteClient
// This allows sharing a remote between the engine and test assertions
#[async_trait]
impl<T: RemoteClient> RemoteClient for std::sync::Arc<T> {
    async fn fetch_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        (**self).fetch_project(project_id).await
    }

    async fn put_project(
        &self,
        project_id: &str,
        payload: &ProjectPayload,
    ) -> Result<ProjectSnapshot> {
        (**self).put_project(project_id, payload).await
    }
}
