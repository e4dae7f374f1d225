//! The editor's working file.
//!
//! The working file holds the editor-owned plot content as JSON, in the
//! same shape as the PUT payload: name, venue, scale, layers, metadata.
//! Sync bookkeeping (versions, timestamps) never touches this file; it
//! lives in the cache and on the server.

use anyhow::{Context, Result};
use plot_sync_core::remote::ProjectPayload;
use plot_sync_core::surface::{EditingSurface, InMemorySurface};
use std::path::Path;

/// Read the working file into a payload.
pub async fn read_payload(path: &Path) -> Result<ProjectPayload> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Write a payload to the working file.
pub async fn write_payload(path: &Path, payload: &ProjectPayload) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let contents = serde_json::to_vec_pretty(payload)?;
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

/// Replace the surface's live state with the working-file content.
pub fn apply_payload(surface: &mut InMemorySurface, payload: &ProjectPayload) {
    surface.set_name(payload.name.clone());
    surface.set_venue(payload.venue.clone());
    surface.set_scale(payload.scale.clone());
    surface.set_metadata(payload.metadata.clone());
    *surface.layers_mut() = payload.layers.clone();
}

/// Capture the surface's live state as a payload.
pub fn payload_from_surface(surface: &InMemorySurface) -> ProjectPayload {
    ProjectPayload {
        name: surface.project_name(),
        venue: surface.venue(),
        scale: surface.scale(),
        layers: surface.layers(),
        metadata: surface.metadata(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plot_sync_core::snapshot::{Annotation, Point};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_working_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plot.json");

        let mut surface = InMemorySurface::new("Cherry Orchard");
        surface.layers_mut().annotations.insert(
            "n1".to_string(),
            Annotation {
                id: "n1".to_string(),
                text: "follow spot here".to_string(),
                location: Point::new(3.0, 4.0),
                font_size: 12.0,
            },
        );

        let payload = payload_from_surface(&surface);
        write_payload(&path, &payload).await.unwrap();

        let read_back = read_payload(&path).await.unwrap();
        assert_eq!(read_back, payload);

        let mut fresh = InMemorySurface::new("scratch");
        apply_payload(&mut fresh, &read_back);
        assert_eq!(fresh.project_name(), "Cherry Orchard");
        assert!(fresh.layers().annotations.contains_key("n1"));
    }

    #[tokio::test]
    async fn test_read_missing_file_fails_with_context() {
        let dir = TempDir::new().unwrap();
        let err = read_payload(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
