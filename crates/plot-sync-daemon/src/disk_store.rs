//! Disk-backed implementation of the core `LocalStore` trait.
//!
//! Layout under the cache directory:
//! - `projects/<id>.json` - cached snapshot
//! - `sessions/<id>.json` - crash-recovery session marker
//!
//! Normal operation goes through `tokio::fs`; the blocking marker writer
//! uses `std::fs` so it can run at forced teardown without a runtime. Both
//! writers produce the same JSON representation.

use async_trait::async_trait;
use plot_sync_core::recovery::RecoverySession;
use plot_sync_core::snapshot::ProjectSnapshot;
use plot_sync_core::store::{LocalStore, Result, StoreError};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_path(&self, project_id: &str) -> PathBuf {
        self.root.join("projects").join(format!("{project_id}.json"))
    }

    fn session_path(&self, project_id: &str) -> PathBuf {
        self.root.join("sessions").join(format!("{project_id}.json"))
    }

    fn io_err(e: std::io::Error) -> StoreError {
        StoreError::Io(e.to_string())
    }

    fn json_err(e: serde_json::Error) -> StoreError {
        StoreError::Serialization(e.to_string())
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Self::io_err)?;
        }
        let contents = serde_json::to_vec_pretty(value).map_err(Self::json_err)?;
        tokio::fs::write(path, contents).await.map_err(Self::io_err)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(contents) => {
                let value = serde_json::from_slice(&contents).map_err(Self::json_err)?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(e)),
        }
    }

    async fn remove(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(e)),
        }
    }
}

#[async_trait]
impl LocalStore for DiskStore {
    async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<()> {
        let path = self.project_path(&snapshot.id);
        Self::write_json(&path, snapshot).await?;
        debug!(project_id = %snapshot.id, version = snapshot.version, "snapshot cached");
        Ok(())
    }

    async fn load_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        Self::read_json(&self.project_path(project_id)).await
    }

    async fn clear_project_cache(&self, project_id: &str) -> Result<()> {
        Self::remove(&self.project_path(project_id)).await
    }

    async fn write_session_marker(&self, session: &RecoverySession) -> Result<()> {
        Self::write_json(&self.session_path(&session.project_id), session).await
    }

    fn write_session_marker_blocking(&self, session: &RecoverySession) -> Result<()> {
        let path = self.session_path(&session.project_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Self::io_err)?;
        }
        let contents = serde_json::to_vec_pretty(session).map_err(Self::json_err)?;
        std::fs::write(&path, contents).map_err(Self::io_err)
    }

    async fn load_session_marker(&self, project_id: &str) -> Result<Option<RecoverySession>> {
        Self::read_json(&self.session_path(project_id)).await
    }

    async fn clear_session_marker(&self, project_id: &str) -> Result<()> {
        Self::remove(&self.session_path(project_id)).await
    }
}
