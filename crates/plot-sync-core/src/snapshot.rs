//! Snapshot model for a lighting plot document.
//!
//! A `ProjectSnapshot` is the full serializable copy of one plot's editable
//! state plus a version counter. The sync engine only ever reads whole
//! snapshots (to push) or replaces whole snapshots (when adopting a remote
//! or resolved copy); individual entities are never mutated in place by the
//! engine, so structural equality over the typed records below is the only
//! comparison the conflict path needs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A point on the plot, in plot units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Venue configuration: the physical space the plot is drawn against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueConfig {
    /// Venue display name
    pub name: String,
    /// Stage width in meters
    pub width: f64,
    /// Stage depth in meters
    pub depth: f64,
    /// Trim height in meters (highest usable hanging point)
    pub trim_height: f64,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed venue".to_string(),
            width: 12.0,
            depth: 10.0,
            trim_height: 7.0,
        }
    }
}

/// Free-form project metadata carried alongside the plot content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    /// Lighting designer credited on the title block
    pub designer: Option<String>,
    /// Producing company or organization
    pub company: Option<String>,
    /// Revision notes shown in the title block
    pub notes: Option<String>,
}

/// Geometry kind for a drawn shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Line,
    Rect,
    Ellipse,
    Polygon,
}

/// A drawn shape on the plot (masking, architecture, groundplan lines).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: String,
    pub kind: ShapeKind,
    pub points: Vec<Point>,
    /// Stroke color as a hex string, e.g. "#333333"
    pub stroke: String,
    pub stroke_width: f64,
}

/// Kind of hanging position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Pipe,
    Truss,
    Boom,
    Ladder,
}

/// A hanging position (electric, truss, boom) instruments attach to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HangingPosition {
    pub id: String,
    pub name: String,
    pub kind: PositionKind,
    pub start: Point,
    pub end: Point,
    /// Hanging height in meters
    pub height: f64,
}

/// A lighting instrument hung on a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub id: String,
    /// Instrument type label, e.g. "Source Four 26°"
    pub instrument_type: String,
    /// Hanging position this unit is attached to, if any
    pub position_id: Option<String>,
    /// Unit number along the position
    pub unit_number: Option<u32>,
    pub location: Point,
    pub rotation: f64,
    /// Dimmer/control channel
    pub channel: Option<u32>,
    /// Gel color, e.g. "R80"
    pub color: Option<String>,
    /// Focus target on the plot, if set
    pub focus: Option<Point>,
}

/// A scenic element drawn for reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPiece {
    pub id: String,
    pub name: String,
    pub outline: Vec<Point>,
}

/// A text annotation pinned to the plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub text: String,
    pub location: Point,
    pub font_size: f64,
}

/// The five entity collections of a plot, keyed by entity id.
///
/// Insertion order is irrelevant; diff and merge operate on id sets and
/// per-id structural equality.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSet {
    pub shapes: HashMap<String, Shape>,
    pub hanging_positions: HashMap<String, HangingPosition>,
    pub instruments: HashMap<String, Instrument>,
    pub set_pieces: HashMap<String, SetPiece>,
    pub annotations: HashMap<String, Annotation>,
}

impl LayerSet {
    /// Total entity count across all collections.
    pub fn entity_count(&self) -> usize {
        self.shapes.len()
            + self.hanging_positions.len()
            + self.instruments.len()
            + self.set_pieces.len()
            + self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }
}

/// Full serializable state of one plot document plus its version counter.
///
/// `version` is monotonically non-decreasing: it strictly increases on every
/// locally committed mutation and is only ever reset by full replacement
/// with an accepted remote snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub id: String,
    pub name: String,
    pub venue: VenueConfig,
    /// Plot scale label, e.g. "1:50"
    pub scale: String,
    pub layers: LayerSet,
    pub metadata: ProjectMetadata,
    pub version: u64,
    /// Unix milliseconds
    pub created_at: u64,
    /// Unix milliseconds
    pub updated_at: u64,
}

impl ProjectSnapshot {
    /// Create an empty version-1 snapshot for a project that has never been
    /// cached or pushed.
    pub fn new_empty(id: impl Into<String>, name: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            venue: VenueConfig::default(),
            scale: "1:50".to_string(),
            layers: LayerSet::default(),
            metadata: ProjectMetadata::default(),
            version: 1,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// True when the editable content (the five collections) is structurally
    /// identical to `other`, ignoring version counters and timestamps.
    pub fn content_equal(&self, other: &ProjectSnapshot) -> bool {
        self.layers == other.layers
    }
}

/// Generate a fresh entity/project id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(id: &str, channel: u32) -> Instrument {
        Instrument {
            id: id.to_string(),
            instrument_type: "Source Four 26°".to_string(),
            position_id: None,
            unit_number: Some(1),
            location: Point::new(1.0, 2.0),
            rotation: 0.0,
            channel: Some(channel),
            color: Some("R80".to_string()),
            focus: None,
        }
    }

    #[test]
    fn test_new_empty_snapshot() {
        let snap = ProjectSnapshot::new_empty("p1", "Cherry Orchard", 1000);
        assert_eq!(snap.version, 1);
        assert_eq!(snap.created_at, 1000);
        assert_eq!(snap.updated_at, 1000);
        assert!(snap.layers.is_empty());
    }

    #[test]
    fn test_content_equal_ignores_version_and_timestamps() {
        let mut a = ProjectSnapshot::new_empty("p1", "Plot", 1000);
        let mut b = a.clone();
        b.version = 9;
        b.updated_at = 9999;
        assert!(a.content_equal(&b));

        a.layers
            .instruments
            .insert("i1".to_string(), instrument("i1", 12));
        assert!(!a.content_equal(&b));
    }

    #[test]
    fn test_content_equal_detects_field_change() {
        let mut a = ProjectSnapshot::new_empty("p1", "Plot", 1000);
        a.layers
            .instruments
            .insert("i1".to_string(), instrument("i1", 12));

        let mut b = a.clone();
        assert!(a.content_equal(&b));

        // Same id set, different per-id content
        b.layers.instruments.get_mut("i1").unwrap().channel = Some(13);
        assert!(!a.content_equal(&b));
    }

    #[test]
    fn test_wire_serialization_is_camel_case() {
        let mut snap = ProjectSnapshot::new_empty("p1", "Plot", 1000);
        snap.layers.hanging_positions.insert(
            "h1".to_string(),
            HangingPosition {
                id: "h1".to_string(),
                name: "1st Electric".to_string(),
                kind: PositionKind::Pipe,
                start: Point::new(0.0, 3.0),
                end: Point::new(12.0, 3.0),
                height: 6.5,
            },
        );

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"hangingPositions\""));
        assert!(json.contains("\"setPieces\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"trimHeight\""));
    }

    #[test]
    fn test_entity_count() {
        let mut layers = LayerSet::default();
        assert!(layers.is_empty());

        layers
            .instruments
            .insert("i1".to_string(), instrument("i1", 1));
        layers.annotations.insert(
            "a1".to_string(),
            Annotation {
                id: "a1".to_string(),
                text: "cyc wash from here".to_string(),
                location: Point::new(4.0, 8.0),
                font_size: 12.0,
            },
        );
        assert_eq!(layers.entity_count(), 2);
    }
}
