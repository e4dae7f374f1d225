//! Structural diff between two snapshots' entity collections.
//!
//! The comparison is id-keyed and directional, from the local side's point
//! of view: entries whose id exists only locally are `added`, entries whose
//! id exists only on the server are `removed`, and entries present on both
//! sides with structurally different content are `modified`. This is an
//! O(total entity count) walk per call, not free; callers run it once per
//! detection, not per edit.

use crate::snapshot::LayerSet;

use serde::Serialize;
use std::collections::HashMap;

/// Diff of one id-keyed collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionDiff {
    /// Ids present only in the local collection
    pub added: Vec<String>,
    /// Ids present only in the server collection
    pub removed: Vec<String>,
    /// Ids present on both sides with differing content
    pub modified: Vec<String>,
}

impl CollectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Aggregate counts across all collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub total_added: usize,
    pub total_removed: usize,
    pub total_modified: usize,
    /// True when any collection has a `modified` entry
    pub has_conflicts: bool,
}

/// Per-collection diff plus the aggregate summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub shapes: CollectionDiff,
    pub hanging_positions: CollectionDiff,
    pub instruments: CollectionDiff,
    pub set_pieces: CollectionDiff,
    pub annotations: CollectionDiff,
    pub summary: DiffSummary,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.summary.total_added == 0
            && self.summary.total_removed == 0
            && self.summary.total_modified == 0
    }
}

/// Diff a single id-keyed collection.
pub fn diff_collection<T: PartialEq>(
    local: &HashMap<String, T>,
    server: &HashMap<String, T>,
) -> CollectionDiff {
    let mut diff = CollectionDiff::default();

    for (id, local_entry) in local {
        match server.get(id) {
            None => diff.added.push(id.clone()),
            Some(server_entry) if server_entry != local_entry => diff.modified.push(id.clone()),
            Some(_) => {}
        }
    }
    for id in server.keys() {
        if !local.contains_key(id) {
            diff.removed.push(id.clone());
        }
    }

    // Deterministic ordering for reporting and tests
    diff.added.sort();
    diff.removed.sort();
    diff.modified.sort();
    diff
}

/// Diff all five collections and build the summary.
pub fn diff_layers(local: &LayerSet, server: &LayerSet) -> DiffResult {
    let shapes = diff_collection(&local.shapes, &server.shapes);
    let hanging_positions = diff_collection(&local.hanging_positions, &server.hanging_positions);
    let instruments = diff_collection(&local.instruments, &server.instruments);
    let set_pieces = diff_collection(&local.set_pieces, &server.set_pieces);
    let annotations = diff_collection(&local.annotations, &server.annotations);

    let all = [
        &shapes,
        &hanging_positions,
        &instruments,
        &set_pieces,
        &annotations,
    ];
    let summary = DiffSummary {
        total_added: all.iter().map(|d| d.added.len()).sum(),
        total_removed: all.iter().map(|d| d.removed.len()).sum(),
        total_modified: all.iter().map(|d| d.modified.len()).sum(),
        has_conflicts: all.iter().any(|d| !d.modified.is_empty()),
    };

    DiffResult {
        shapes,
        hanging_positions,
        instruments,
        set_pieces,
        annotations,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Point, Shape, ShapeKind};

    fn shape(id: &str, stroke: &str) -> Shape {
        Shape {
            id: id.to_string(),
            kind: ShapeKind::Rect,
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            stroke: stroke.to_string(),
            stroke_width: 1.0,
        }
    }

    fn layers_with_shapes(shapes: &[Shape]) -> LayerSet {
        let mut layers = LayerSet::default();
        for s in shapes {
            layers.shapes.insert(s.id.clone(), s.clone());
        }
        layers
    }

    #[test]
    fn test_local_only_and_server_only_entries() {
        // local {A, B}, server {A, C}
        let local = layers_with_shapes(&[shape("A", "#000"), shape("B", "#000")]);
        let server = layers_with_shapes(&[shape("A", "#000"), shape("C", "#000")]);

        let diff = diff_layers(&local, &server);
        assert_eq!(diff.shapes.added, vec!["B".to_string()]);
        assert_eq!(diff.shapes.removed, vec!["C".to_string()]);
        assert!(diff.shapes.modified.is_empty());
        assert_eq!(diff.summary.total_added, 1);
        assert_eq!(diff.summary.total_removed, 1);
        assert!(!diff.summary.has_conflicts);
    }

    #[test]
    fn test_modified_entry_sets_has_conflicts() {
        let local = layers_with_shapes(&[shape("A", "#000")]);
        let server = layers_with_shapes(&[shape("A", "#fff")]);

        let diff = diff_layers(&local, &server);
        assert_eq!(diff.shapes.modified, vec!["A".to_string()]);
        assert!(diff.summary.has_conflicts);
        assert_eq!(diff.summary.total_modified, 1);
    }

    #[test]
    fn test_identical_layers_diff_is_empty() {
        let layers = layers_with_shapes(&[shape("A", "#000"), shape("B", "#000")]);
        let diff = diff_layers(&layers, &layers.clone());
        assert!(diff.is_empty());
        assert!(!diff.summary.has_conflicts);
    }

    #[test]
    fn test_diff_spans_multiple_collections() {
        let mut local = layers_with_shapes(&[shape("A", "#000")]);
        let mut server = LayerSet::default();

        local.annotations.insert(
            "n1".to_string(),
            crate::snapshot::Annotation {
                id: "n1".to_string(),
                text: "house left boom".to_string(),
                location: Point::new(2.0, 2.0),
                font_size: 12.0,
            },
        );
        server.annotations.insert(
            "n2".to_string(),
            crate::snapshot::Annotation {
                id: "n2".to_string(),
                text: "cut this".to_string(),
                location: Point::new(3.0, 3.0),
                font_size: 12.0,
            },
        );

        let diff = diff_layers(&local, &server);
        assert_eq!(diff.summary.total_added, 2); // shape A + annotation n1
        assert_eq!(diff.summary.total_removed, 1); // annotation n2
        assert_eq!(diff.annotations.added, vec!["n1".to_string()]);
        assert_eq!(diff.annotations.removed, vec!["n2".to_string()]);
    }

    #[test]
    fn test_diff_ordering_is_deterministic() {
        let local = layers_with_shapes(&[shape("z", "#000"), shape("a", "#000"), shape("m", "#000")]);
        let server = LayerSet::default();

        let diff = diff_layers(&local, &server);
        assert_eq!(
            diff.shapes.added,
            vec!["a".to_string(), "m".to_string(), "z".to_string()]
        );
    }
}
