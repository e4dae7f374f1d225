//! Conflict detection and resolution between local and remote snapshots.
//!
//! A conflict exists only when the remote is strictly ahead by version AND
//! the two snapshots' collections actually diverge structurally. Version
//! skew with identical content (a push that round-tripped, a metadata-only
//! bump) is not a conflict and is adopted silently by the orchestrator.
//!
//! Resolution is deliberately simple and server-authoritative: there is no
//! field-level three-way merge. `Merge` takes the server snapshot as the
//! baseline and inserts entries that exist only locally; entries present on
//! both sides keep the server's content.

use crate::diff::{diff_layers, DiffResult};
use crate::snapshot::{LayerSet, ProjectSnapshot};

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Invalid resolution strategy: {0}")]
    InvalidStrategy(String),

    #[error("No active conflict to resolve")]
    NoActiveConflict,
}

pub type Result<T> = std::result::Result<T, ConflictError>;

/// How to resolve a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Take the server snapshot verbatim; local divergence is discarded.
    AcceptServer,
    /// Keep the local snapshot verbatim, versioned past the server so the
    /// next push is not rejected as stale.
    KeepLocal,
    /// Server-authoritative union: server content wins per entry, local-only
    /// entries are kept.
    Merge,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::AcceptServer => "accept-server",
            ResolutionStrategy::KeepLocal => "keep-local",
            ResolutionStrategy::Merge => "merge",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = ConflictError;

    /// Parsing is the invalid-argument boundary: anything but the three
    /// known strategy names fails synchronously.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accept-server" => Ok(ResolutionStrategy::AcceptServer),
            "keep-local" => Ok(ResolutionStrategy::KeepLocal),
            "merge" => Ok(ResolutionStrategy::Merge),
            other => Err(ConflictError::InvalidStrategy(other.to_string())),
        }
    }
}

/// A detected divergence awaiting resolution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub project_id: String,
    pub local_version: u64,
    pub server_version: u64,
    pub local_snapshot: ProjectSnapshot,
    pub server_snapshot: ProjectSnapshot,
    /// Unix milliseconds
    pub detected_at: u64,
}

impl ConflictRecord {
    /// Structural diff between the two sides, local perspective.
    pub fn diff(&self) -> DiffResult {
        diff_layers(&self.local_snapshot.layers, &self.server_snapshot.layers)
    }
}

/// Holds at most one live conflict and executes resolution strategies.
#[derive(Debug, Default)]
pub struct ConflictManager {
    active: Option<ConflictRecord>,
}

impl ConflictManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a pulled remote snapshot conflicts with local state.
    ///
    /// No conflict is possible unless the remote is strictly ahead
    /// (`server_version > local_version`); when it is, the version skew is
    /// only a conflict if the collections diverge structurally.
    pub fn detect(
        local: &ProjectSnapshot,
        server: &ProjectSnapshot,
        local_version: u64,
        server_version: u64,
    ) -> bool {
        if local_version >= server_version {
            return false;
        }
        !local.content_equal(server)
    }

    /// Register a detected conflict. Replaces any previous record; the
    /// orchestrator guarantees at most one is live.
    pub fn begin(&mut self, record: ConflictRecord) {
        debug!(
            project_id = %record.project_id,
            local_version = record.local_version,
            server_version = record.server_version,
            "conflict recorded"
        );
        self.active = Some(record);
    }

    pub fn active(&self) -> Option<&ConflictRecord> {
        self.active.as_ref()
    }

    pub fn has_conflict(&self) -> bool {
        self.active.is_some()
    }

    /// Drop the active record without resolving it.
    pub fn cancel(&mut self) -> Option<ConflictRecord> {
        self.active.take()
    }

    /// Execute a resolution strategy against the active conflict.
    ///
    /// Returns the snapshot to adopt. Version contract:
    /// - `AcceptServer`: server snapshot verbatim, `version = server_version`
    /// - `KeepLocal`: local snapshot verbatim, `version = server_version + 1`
    /// - `Merge`: merged content, `version = server_version + 1`
    ///
    /// On success the active record is cleared.
    pub fn resolve(&mut self, strategy: ResolutionStrategy) -> Result<ProjectSnapshot> {
        let record = self.active.take().ok_or(ConflictError::NoActiveConflict)?;

        let resolved = match strategy {
            ResolutionStrategy::AcceptServer => {
                let mut snap = record.server_snapshot.clone();
                snap.version = record.server_version;
                snap
            }
            ResolutionStrategy::KeepLocal => {
                let mut snap = record.local_snapshot.clone();
                snap.version = record.server_version + 1;
                snap
            }
            ResolutionStrategy::Merge => {
                let mut snap = record.server_snapshot.clone();
                snap.layers = merge_layers(
                    &record.server_snapshot.layers,
                    &record.local_snapshot.layers,
                );
                snap.version = record.server_version + 1;
                snap
            }
        };

        debug!(
            project_id = %record.project_id,
            strategy = %strategy,
            version = resolved.version,
            "conflict resolved"
        );
        Ok(resolved)
    }
}

/// Merge one id-keyed collection, server-authoritative per entry.
fn merge_collection<T: Clone>(
    server: &HashMap<String, T>,
    local: &HashMap<String, T>,
) -> HashMap<String, T> {
    let mut merged = server.clone();
    for (id, entry) in local {
        // Local-only entries survive; entries on both sides keep the
        // server's content.
        merged.entry(id.clone()).or_insert_with(|| entry.clone());
    }
    merged
}

/// Merge all five collections.
///
/// TODO: whole-entry merge only. If per-field merging ever becomes a
/// requirement, it needs a three-way base and belongs in a separate pass.
pub fn merge_layers(server: &LayerSet, local: &LayerSet) -> LayerSet {
    LayerSet {
        shapes: merge_collection(&server.shapes, &local.shapes),
        hanging_positions: merge_collection(&server.hanging_positions, &local.hanging_positions),
        instruments: merge_collection(&server.instruments, &local.instruments),
        set_pieces: merge_collection(&server.set_pieces, &local.set_pieces),
        annotations: merge_collection(&server.annotations, &local.annotations),
    }
}
