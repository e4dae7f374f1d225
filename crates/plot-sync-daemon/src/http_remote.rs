//! REST implementation of the core `RemoteClient` trait.
//!
//! Wire contract with the project server:
//! - `GET /projects/{id}` -> `{"project": {...}}`, 404 when the project has
//!   never been created remotely (treated as success, not an error)
//! - `PUT /projects/{id}` with the content payload -> `{"project": {...}}`
//!   carrying the server-assigned incremented version
//! - `GET /health` -> 2xx when the server is reachable, used as the
//!   connectivity probe

use async_trait::async_trait;
use plot_sync_core::remote::{ProjectPayload, RemoteClient, RemoteError, Result};
use plot_sync_core::snapshot::ProjectSnapshot;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response envelope used by both GET and PUT.
#[derive(Debug, Deserialize)]
struct ProjectEnvelope {
    project: ProjectSnapshot,
}

/// HTTP client for the remote project server.
///
/// Cheap to clone: reqwest clients share their connection pool, so the
/// connectivity probe and the sync engine reuse one client.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn project_url(&self, project_id: &str) -> String {
        format!("{}/projects/{}", self.base_url, project_id)
    }

    /// Lightweight reachability probe.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            }
        }
    }

    async fn parse_project(response: Response) -> Result<ProjectSnapshot> {
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http { status, message });
        }
        let envelope: ProjectEnvelope = response
            .json()
            .await
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        Ok(envelope.project)
    }
}

#[async_trait]
impl RemoteClient for HttpRemote {
    async fn fetch_project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        let response = self
            .client
            .get(self.project_url(project_id))
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        // Not created remotely yet: success with nothing to adopt
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let project = Self::parse_project(response).await?;
        debug!(project_id, version = project.version, "fetched remote snapshot");
        Ok(Some(project))
    }

    async fn put_project(
        &self,
        project_id: &str,
        payload: &ProjectPayload,
    ) -> Result<ProjectSnapshot> {
        let response = self
            .client
            .put(self.project_url(project_id))
            .json(payload)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let project = Self::parse_project(response).await?;
        debug!(project_id, version = project.version, "push accepted by remote");
        Ok(project)
    }
}
