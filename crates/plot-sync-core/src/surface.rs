//! Editing-surface collaborator.
//!
//! The editing surface owns the live, interactively mutated plot state. The
//! sync engine treats it as an external collaborator: it reads a full copy
//! of every collection when building a snapshot to push, and replaces the
//! whole state when adopting a remote or resolved snapshot. The engine never
//! mutates individual entities through this seam, which is what lets the
//! whole design get away without locks.

use crate::snapshot::{LayerSet, ProjectMetadata, ProjectSnapshot, VenueConfig};

/// Read/replace access to the live editing state.
///
/// Implementations are in-memory by contract, so the accessors are
/// synchronous. Mutation of individual entities belongs to the editor and is
/// out of scope here.
pub trait EditingSurface {
    /// Current project display name.
    fn project_name(&self) -> String;

    /// Current venue configuration.
    fn venue(&self) -> VenueConfig;

    /// Current plot scale label.
    fn scale(&self) -> String;

    /// Full copy of all five entity collections.
    fn layers(&self) -> LayerSet;

    /// Current project metadata.
    fn metadata(&self) -> ProjectMetadata;

    /// Clear the live state and repopulate it from an adopted snapshot.
    fn load_snapshot(&mut self, snapshot: &ProjectSnapshot);
}

/// Plain in-memory surface.
///
/// Used by tests and by the headless agent, where "the editor" is a working
/// file loaded into memory. A GUI host would implement [`EditingSurface`]
/// over its own document store instead.
#[derive(Debug, Clone, Default)]
pub struct InMemorySurface {
    name: String,
    venue: VenueConfig,
    scale: String,
    layers: LayerSet,
    metadata: ProjectMetadata,
}

impl InMemorySurface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            venue: VenueConfig::default(),
            scale: "1:50".to_string(),
            layers: LayerSet::default(),
            metadata: ProjectMetadata::default(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_venue(&mut self, venue: VenueConfig) {
        self.venue = venue;
    }

    pub fn set_scale(&mut self, scale: impl Into<String>) {
        self.scale = scale.into();
    }

    pub fn set_metadata(&mut self, metadata: ProjectMetadata) {
        self.metadata = metadata;
    }

    /// Direct access to the collections, for the host that owns the edits.
    pub fn layers_mut(&mut self) -> &mut LayerSet {
        &mut self.layers
    }
}

impl EditingSurface for InMemorySurface {
    fn project_name(&self) -> String {
        self.name.clone()
    }

    fn venue(&self) -> VenueConfig {
        self.venue.clone()
    }

    fn scale(&self) -> String {
        self.scale.clone()
    }

    fn layers(&self) -> LayerSet {
        self.layers.clone()
    }

    fn metadata(&self) -> ProjectMetadata {
        self.metadata.clone()
    }

    fn load_snapshot(&mut self, snapshot: &ProjectSnapshot) {
        self.name = snapshot.name.clone();
        self.venue = snapshot.venue.clone();
        self.scale = snapshot.scale.clone();
        self.layers = snapshot.layers.clone();
        self.metadata = snapshot.metadata.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Annotation, Point};

    #[test]
    fn test_load_snapshot_replaces_whole_state() {
        let mut surface = InMemorySurface::new("Scratch");
        surface.layers_mut().annotations.insert(
            "old".to_string(),
            Annotation {
                id: "old".to_string(),
                text: "stale".to_string(),
                location: Point::new(0.0, 0.0),
                font_size: 10.0,
            },
        );

        let mut snap = ProjectSnapshot::new_empty("p1", "Adopted", 500);
        snap.layers.annotations.insert(
            "new".to_string(),
            Annotation {
                id: "new".to_string(),
                text: "fresh".to_string(),
                location: Point::new(1.0, 1.0),
                font_size: 12.0,
            },
        );
        surface.load_snapshot(&snap);

        assert_eq!(surface.project_name(), "Adopted");
        let layers = surface.layers();
        assert!(layers.annotations.contains_key("new"));
        assert!(!layers.annotations.contains_key("old"));
    }
}
