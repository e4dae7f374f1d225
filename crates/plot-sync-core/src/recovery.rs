//! Crash-recovery bookkeeping.
//!
//! A `RecoverySession` liveness marker answers "was the last session for
//! this project cleanly closed?". The marker is refreshed on every edit and
//! on initialize, and flipped to clean on orderly dispose. Two write paths
//! exist for it on the store: the async writer used during normal
//! operation, and a blocking writer for forced process teardown. Both write
//! the same representation; the blocking path is best effort and may be
//! stale when observed later.
//!
//! On the next initialize for the same project id, a marker without a clean
//! shutdown plus a cached snapshot newer than the known remote state
//! produces a `RecoveryInfo`, so the caller can offer "restore from cache"
//! or "discard and use remote".

use crate::snapshot::ProjectSnapshot;
use crate::store::{LocalStore, Result, StoreError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Liveness marker for one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySession {
    pub project_id: String,
    /// Unix milliseconds of the last edit or initialize
    pub last_active_at: u64,
    pub clean_shutdown: bool,
}

/// Offer produced when an unclean shutdown left newer local state behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryInfo {
    pub project_id: String,
    /// Version of the cached snapshot that survived the crash
    pub cached_version: u64,
    /// Remote version known at check time; 0 when unknown or not created
    pub remote_version: u64,
    /// When the crashed session was last active, unix milliseconds
    pub last_active_at: u64,
}

/// Marker bookkeeping for one project's session.
#[derive(Debug)]
pub struct CrashRecoveryTracker {
    project_id: String,
}

impl CrashRecoveryTracker {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn session(&self, now_ms: u64, clean_shutdown: bool) -> RecoverySession {
        RecoverySession {
            project_id: self.project_id.clone(),
            last_active_at: now_ms,
            clean_shutdown,
        }
    }

    /// Refresh the liveness marker (async path, normal operation).
    pub async fn mark_active<S: LocalStore>(&self, store: &S, now_ms: u64) -> Result<()> {
        store
            .write_session_marker(&self.session(now_ms, false))
            .await
    }

    /// Refresh the liveness marker without suspending (forced-teardown
    /// path). Best effort: failures are logged, not propagated.
    pub fn mark_active_blocking<S: LocalStore>(&self, store: &S, now_ms: u64) {
        if let Err(e) = store.write_session_marker_blocking(&self.session(now_ms, false)) {
            warn!(project_id = %self.project_id, error = %e, "blocking session marker write failed");
        }
    }

    /// Record an orderly shutdown (async path).
    pub async fn mark_clean_shutdown<S: LocalStore>(&self, store: &S, now_ms: u64) -> Result<()> {
        store
            .write_session_marker(&self.session(now_ms, true))
            .await
    }

    /// Record an orderly shutdown without suspending. Best effort.
    pub fn mark_clean_shutdown_blocking<S: LocalStore>(&self, store: &S, now_ms: u64) {
        if let Err(e) = store.write_session_marker_blocking(&self.session(now_ms, true)) {
            warn!(project_id = %self.project_id, error = %e, "blocking clean-shutdown write failed");
        }
    }

    /// Decide whether to offer recovery, given the previous session marker,
    /// the cached snapshot, and the remote state known at check time
    /// (`None` when offline or the fetch failed).
    ///
    /// Offers recovery when the previous session did not shut down cleanly
    /// and the cache is newer than the known remote state: version first,
    /// `updated_at` as the tiebreak, and unknown remote counts as older.
    pub fn evaluate(
        &self,
        previous: Option<&RecoverySession>,
        cached: Option<&ProjectSnapshot>,
        remote: Option<(u64, u64)>,
    ) -> Option<RecoveryInfo> {
        let marker = previous?;
        if marker.clean_shutdown {
            return None;
        }
        let cached = cached?;

        let newer_than_remote = match remote {
            None => true,
            Some((remote_version, remote_updated_at)) => {
                cached.version > remote_version
                    || (cached.version == remote_version && cached.updated_at > remote_updated_at)
            }
        };
        if !newer_than_remote {
            debug!(
                project_id = %self.project_id,
                cached_version = cached.version,
                "unclean shutdown but remote is current, no recovery needed"
            );
            return None;
        }

        Some(RecoveryInfo {
            project_id: self.project_id.clone(),
            cached_version: cached.version,
            remote_version: remote.map(|(v, _)| v).unwrap_or(0),
            last_active_at: marker.last_active_at,
        })
    }

    /// Load the marker left by the previous session, if any.
    pub async fn load_previous<S: LocalStore>(
        &self,
        store: &S,
    ) -> std::result::Result<Option<RecoverySession>, StoreError> {
        store.load_session_marker(&self.project_id).await
    }

    /// Remove the marker entirely.
    pub async fn clear<S: LocalStore>(&self, store: &S) -> Result<()> {
        store.clear_session_marker(&self.project_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn unclean_marker(last_active_at: u64) -> RecoverySession {
        RecoverySession {
            project_id: "p1".to_string(),
            last_active_at,
            clean_shutdown: false,
        }
    }

    fn cached_snapshot(version: u64, updated_at: u64) -> ProjectSnapshot {
        let mut snap = ProjectSnapshot::new_empty("p1", "Plot", 1000);
        snap.version = version;
        snap.updated_at = updated_at;
        snap
    }

    // ==================== evaluate ====================

    #[test]
    fn test_no_marker_means_no_recovery() {
        let tracker = CrashRecoveryTracker::new("p1");
        let cached = cached_snapshot(5, 2000);
        assert!(tracker.evaluate(None, Some(&cached), None).is_none());
    }

    #[test]
    fn test_clean_shutdown_means_no_recovery() {
        let tracker = CrashRecoveryTracker::new("p1");
        let marker = RecoverySession {
            clean_shutdown: true,
            ..unclean_marker(1500)
        };
        let cached = cached_snapshot(5, 2000);
        assert!(tracker
            .evaluate(Some(&marker), Some(&cached), None)
            .is_none());
    }

    #[test]
    fn test_unclean_shutdown_with_newer_cache_offers_recovery() {
        let tracker = CrashRecoveryTracker::new("p1");
        let marker = unclean_marker(1500);
        let cached = cached_snapshot(5, 2000);

        let info = tracker
            .evaluate(Some(&marker), Some(&cached), Some((3, 1800)))
            .unwrap();
        assert_eq!(info.cached_version, 5);
        assert_eq!(info.remote_version, 3);
        assert_eq!(info.last_active_at, 1500);
    }

    #[test]
    fn test_remote_current_means_no_recovery() {
        let tracker = CrashRecoveryTracker::new("p1");
        let marker = unclean_marker(1500);
        let cached = cached_snapshot(5, 2000);

        // Remote is ahead by version
        assert!(tracker
            .evaluate(Some(&marker), Some(&cached), Some((6, 1000)))
            .is_none());
        // Same version, remote timestamp newer or equal
        assert!(tracker
            .evaluate(Some(&marker), Some(&cached), Some((5, 2000)))
            .is_none());
    }

    #[test]
    fn test_timestamp_breaks_version_tie() {
        let tracker = CrashRecoveryTracker::new("p1");
        let marker = unclean_marker(1500);
        let cached = cached_snapshot(5, 2000);

        let info = tracker.evaluate(Some(&marker), Some(&cached), Some((5, 1900)));
        assert!(info.is_some());
    }

    #[test]
    fn test_unknown_remote_counts_as_older() {
        let tracker = CrashRecoveryTracker::new("p1");
        let marker = unclean_marker(1500);
        let cached = cached_snapshot(1, 1000);

        let info = tracker.evaluate(Some(&marker), Some(&cached), None).unwrap();
        assert_eq!(info.remote_version, 0);
    }

    #[test]
    fn test_no_cache_means_no_recovery() {
        let tracker = CrashRecoveryTracker::new("p1");
        let marker = unclean_marker(1500);
        assert!(tracker.evaluate(Some(&marker), None, None).is_none());
    }

    // ==================== marker lifecycle ====================

    #[tokio::test]
    async fn test_marker_lifecycle_across_sessions() {
        let store = InMemoryStore::new();
        let tracker = CrashRecoveryTracker::new("p1");

        // Session runs and dies without a clean shutdown
        tracker.mark_active(&store, 1000).await.unwrap();
        let previous = tracker.load_previous(&store).await.unwrap().unwrap();
        assert!(!previous.clean_shutdown);
        assert_eq!(previous.last_active_at, 1000);

        // Next session shuts down cleanly
        tracker.mark_clean_shutdown(&store, 2000).await.unwrap();
        let previous = tracker.load_previous(&store).await.unwrap().unwrap();
        assert!(previous.clean_shutdown);
    }

    #[tokio::test]
    async fn test_blocking_writer_is_observable_by_async_reader() {
        let store = InMemoryStore::new();
        let tracker = CrashRecoveryTracker::new("p1");

        tracker.mark_clean_shutdown_blocking(&store, 3000);
        let marker = tracker.load_previous(&store).await.unwrap().unwrap();
        assert!(marker.clean_shutdown);
        assert_eq!(marker.last_active_at, 3000);
    }
}
