//! SyncOrchestrator: composes the sync engine.
//!
//! Owns sync status, dirty tracking, debounced scheduling, and the public
//! lifecycle. The concurrency model is single-threaded and cooperative:
//! every method takes `&mut self`, time-dependent operations take an
//! explicit `now_ms`, and deadlines (debounce windows, retries) are plain
//! timestamps fired by `tick`, which the host calls from its interval loop.
//! Suspension points are exactly store writes and remote calls; nothing
//! else can interleave, so correctness rests on monotonic version counters
//! and idempotent whole-snapshot replacement rather than locks.
//!
//! Debounce windows are cancel-and-restart: N edits inside a window
//! collapse to exactly one local persist and one remote push. Across
//! windows only "last scheduled snapshot wins"; no attempt is made to
//! preserve per-edit causal ordering at the network boundary.

use crate::conflict::{ConflictError, ConflictManager, ConflictRecord, ResolutionStrategy};
use crate::connectivity::{ConnectivityMonitor, Transition};
use crate::events::{EventBus, SyncEvent};
use crate::recovery::{CrashRecoveryTracker, RecoveryInfo};
use crate::remote::{ProjectPayload, RemoteClient};
use crate::snapshot::ProjectSnapshot;
use crate::store::{LocalStore, StoreError};
use crate::surface::EditingSurface;
use crate::retry::{RetryController, RetryPolicy};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Sync engine not initialized")]
    NotInitialized,

    #[error("Sync engine already initialized")]
    AlreadyInitialized,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Sync status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
    Offline,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error => "error",
            SyncStatus::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Observable sync state. Owned exclusively by the orchestrator and mutated
/// only by its methods.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub is_dirty: bool,
    pub status: SyncStatus,
    pub local_version: u64,
    pub server_version: u64,
    /// Unix milliseconds of the last accepted push
    pub last_sync_time: Option<u64>,
    pub last_error: Option<String>,
    pub is_online: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            is_dirty: false,
            status: SyncStatus::Idle,
            local_version: 0,
            server_version: 0,
            last_sync_time: None,
            last_error: None,
            is_online: true,
        }
    }
}

/// Outcome of a push attempt. Network failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    /// True when the push was withheld offline and queued for reconnect
    pub queued: bool,
    pub error: Option<String>,
}

impl SyncResult {
    fn ok() -> Self {
        Self {
            success: true,
            queued: false,
            error: None,
        }
    }

    fn queued() -> Self {
        Self {
            success: false,
            queued: true,
            error: Some("offline; push queued".to_string()),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            queued: false,
            error: Some(message.into()),
        }
    }
}

/// Outcome of a pull attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResult {
    pub success: bool,
    /// Version observed on the remote; 0 when the project does not exist
    /// remotely yet
    pub server_version: u64,
    /// True when the pull detected divergence and recorded a conflict
    pub conflict: bool,
    pub error: Option<String>,
}

impl PullResult {
    fn ok(server_version: u64, conflict: bool) -> Self {
        Self {
            success: true,
            server_version,
            conflict,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            server_version: 0,
            conflict: false,
            error: Some(message.into()),
        }
    }
}

/// Tunable timing parameters.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote-push debounce window
    pub push_debounce_ms: u64,
    /// Local-persist debounce window
    pub save_debounce_ms: u64,
    /// Base delay for linear push-retry backoff
    pub retry_base_delay_ms: u64,
    /// Failed push attempts allowed before giving up
    pub max_retry_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            push_debounce_ms: 500,
            save_debounce_ms: 50,
            retry_base_delay_ms: 5_000,
            max_retry_attempts: 3,
        }
    }
}

/// Top-level sync engine for one plot document's editing session.
///
/// Create one per session and `dispose` it at session end; there is no
/// process-wide instance.
pub struct SyncOrchestrator<S, R, E>
where
    S: LocalStore,
    R: RemoteClient,
    E: EditingSurface,
{
    store: S,
    remote: R,
    surface: E,
    config: SyncConfig,
    events: Arc<EventBus>,
    state: SyncState,
    conflicts: ConflictManager,
    retry: RetryController,
    connectivity: ConnectivityMonitor,
    tracker: Option<CrashRecoveryTracker>,
    project_id: Option<String>,
    created_at: u64,
    /// Local-persist debounce deadline
    save_due: Option<u64>,
    /// Remote-push debounce deadline
    push_due: Option<u64>,
    /// A push was withheld while offline and should re-arm on reconnect
    push_pending_offline: bool,
    running: bool,
}

impl<S, R, E> SyncOrchestrator<S, R, E>
where
    S: LocalStore,
    R: RemoteClient,
    E: EditingSurface,
{
    pub fn new(store: S, remote: R, surface: E, config: SyncConfig) -> Self {
        let retry = RetryController::new(RetryPolicy {
            base_delay_ms: config.retry_base_delay_ms,
            max_attempts: config.max_retry_attempts,
        });
        Self {
            store,
            remote,
            surface,
            config,
            events: Arc::new(EventBus::new()),
            state: SyncState::default(),
            conflicts: ConflictManager::new(),
            retry,
            connectivity: ConnectivityMonitor::new(),
            tracker: None,
            project_id: None,
            created_at: 0,
            save_due: None,
            push_due: None,
            push_pending_offline: false,
            running: false,
        }
    }

    // ==================== accessors ====================

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn has_conflict(&self) -> bool {
        self.conflicts.has_conflict()
    }

    pub fn conflict(&self) -> Option<&ConflictRecord> {
        self.conflicts.active()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn surface(&self) -> &E {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut E {
        &mut self.surface
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ==================== lifecycle ====================

    /// Initialize the engine for one project.
    ///
    /// Marks the session active (blocking best-effort, then awaited async),
    /// adopts the local cache or creates a fresh version-1 snapshot, and
    /// performs one pull when online. Returns a `RecoveryInfo` instead of
    /// pulling when the previous session died uncleanly and left newer
    /// local state behind; the caller then picks `recover_from_cache` or
    /// `discard_cache`.
    pub async fn initialize(
        &mut self,
        project_id: &str,
        now_ms: u64,
    ) -> Result<Option<RecoveryInfo>> {
        if self.project_id.is_some() {
            return Err(OrchestratorError::AlreadyInitialized);
        }

        let tracker = CrashRecoveryTracker::new(project_id);

        // Read what the previous session left behind before overwriting it.
        let previous_marker = tracker.load_previous(&self.store).await?;
        let cached = self.store.load_project(project_id).await?;

        tracker.mark_active_blocking(&self.store, now_ms);
        tracker.mark_active(&self.store, now_ms).await?;

        // When an unclean shutdown left a cache behind, the remote state at
        // check time decides whether recovery is worth offering. One fetch
        // serves both the check and the initial pull.
        let crashed = previous_marker
            .as_ref()
            .map(|m| !m.clean_shutdown)
            .unwrap_or(false)
            && cached.is_some();
        let mut prefetched: Option<Option<ProjectSnapshot>> = None;
        let remote_known = if crashed && self.connectivity.is_online() {
            match self.remote.fetch_project(project_id).await {
                Ok(found) => {
                    let known = Some(
                        found
                            .as_ref()
                            .map(|s| (s.version, s.updated_at))
                            .unwrap_or((0, 0)),
                    );
                    prefetched = Some(found);
                    known
                }
                Err(e) => {
                    warn!(error = %e, "remote unreachable during recovery check");
                    None
                }
            }
        } else {
            None
        };

        match &cached {
            Some(snap) => {
                self.surface.load_snapshot(snap);
                self.state.local_version = snap.version;
                self.state.server_version = snap.version;
                self.created_at = snap.created_at;
                debug!(project_id, version = snap.version, "adopted cached snapshot");
            }
            None => {
                let snap =
                    ProjectSnapshot::new_empty(project_id, self.surface.project_name(), now_ms);
                self.store.save_project(&snap).await?;
                self.surface.load_snapshot(&snap);
                self.state.local_version = 1;
                self.state.server_version = 0;
                self.created_at = now_ms;
                debug!(project_id, "created fresh snapshot");
            }
        }

        let recovery = tracker.evaluate(previous_marker.as_ref(), cached.as_ref(), remote_known);
        self.project_id = Some(project_id.to_string());
        self.tracker = Some(tracker);

        if let Some(info) = &recovery {
            info!(
                project_id,
                cached_version = info.cached_version,
                remote_version = info.remote_version,
                "unclean shutdown detected, offering recovery"
            );
            self.events.emit(SyncEvent::RecoveryAvailable {
                cached_version: info.cached_version,
                timestamp: now_ms,
            });
            return Ok(recovery);
        }

        if self.connectivity.is_online() {
            match prefetched {
                Some(found) => {
                    let _ = self.apply_pull(found, now_ms).await;
                }
                None => {
                    let _ = self.pull_from_remote(now_ms).await;
                }
            }
        }
        Ok(None)
    }

    /// Arm the engine: `tick` only fires deadlines while running.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Cancel pending timers. In-flight work that resolves later is ignored
    /// by the running gate; it is not cancelled retroactively.
    pub fn stop(&mut self) {
        self.running = false;
        self.save_due = None;
        self.push_due = None;
        self.retry.cancel();
    }

    /// Flush a pending local save and record an orderly shutdown.
    ///
    /// Hosts that cannot await at teardown use
    /// `write_clean_shutdown_blocking` instead.
    pub async fn dispose(&mut self, now_ms: u64) -> Result<()> {
        if self.project_id.is_some() {
            if self.save_due.is_some() || self.state.is_dirty {
                self.save_due = None;
                self.flush_local_save(now_ms).await;
            }
            if let Some(tracker) = &self.tracker {
                tracker.mark_clean_shutdown(&self.store, now_ms).await?;
            }
        }
        self.stop();
        Ok(())
    }

    /// Blocking clean-shutdown marker for forced teardown. Best effort.
    pub fn write_clean_shutdown_blocking(&self, now_ms: u64) {
        if let Some(tracker) = &self.tracker {
            tracker.mark_clean_shutdown_blocking(&self.store, now_ms);
        }
    }

    // ==================== edits and scheduling ====================

    /// Record a local edit: bump the version, mark dirty, and restart both
    /// debounce windows.
    pub async fn mark_dirty(&mut self, now_ms: u64) -> Result<()> {
        if self.project_id.is_none() {
            return Err(OrchestratorError::NotInitialized);
        }
        self.state.local_version += 1;
        self.state.is_dirty = true;

        // Liveness marker rides along with every edit, best effort.
        if let Some(tracker) = &self.tracker {
            if let Err(e) = tracker.mark_active(&self.store, now_ms).await {
                warn!(error = %e, "session marker refresh failed");
            }
        }

        self.schedule_debounced(now_ms);
        Ok(())
    }

    /// Fire any due deadlines: local save, scheduled push, retry push.
    ///
    /// The host calls this from its interval loop. A no-op unless the
    /// engine is running, which is also what makes work landing after
    /// `stop`/`dispose` harmless.
    pub async fn tick(&mut self, now_ms: u64) -> Result<()> {
        if !self.running || self.project_id.is_none() {
            return Ok(());
        }

        if let Some(due) = self.save_due {
            if now_ms >= due {
                self.save_due = None;
                self.flush_local_save(now_ms).await;
            }
        }

        if let Some(due) = self.push_due {
            if now_ms >= due {
                self.push_due = None;
                let _ = self.push_to_remote(now_ms).await;
            }
        } else if self.retry.take_due(now_ms) {
            let _ = self.push_to_remote(now_ms).await;
        }

        Ok(())
    }

    fn schedule_debounced(&mut self, now_ms: u64) {
        self.save_due = Some(now_ms + self.config.save_debounce_ms);
        if self.connectivity.is_online() && !self.conflicts.has_conflict() {
            self.push_due = Some(now_ms + self.config.push_debounce_ms);
        }
    }

    async fn flush_local_save(&mut self, now_ms: u64) {
        let snapshot = self.current_snapshot(now_ms);
        match self.store.save_project(&snapshot).await {
            Ok(()) => debug!(version = snapshot.version, "local persist"),
            Err(e) => {
                warn!(error = %e, "local persist failed");
                self.state.last_error = Some(format!("local persist failed: {e}"));
            }
        }
    }

    fn current_snapshot(&self, now_ms: u64) -> ProjectSnapshot {
        ProjectSnapshot {
            id: self.project_id.clone().unwrap_or_default(),
            name: self.surface.project_name(),
            venue: self.surface.venue(),
            scale: self.surface.scale(),
            layers: self.surface.layers(),
            metadata: self.surface.metadata(),
            version: self.state.local_version,
            created_at: self.created_at,
            updated_at: now_ms,
        }
    }

    // ==================== push ====================

    /// Push the current snapshot to the remote store.
    pub async fn push_to_remote(&mut self, now_ms: u64) -> SyncResult {
        let project_id = match &self.project_id {
            Some(id) => id.clone(),
            None => return SyncResult::failed("not initialized"),
        };
        if self.conflicts.has_conflict() {
            return SyncResult::failed("conflict pending; resolve before pushing");
        }
        if !self.connectivity.is_online() {
            self.push_pending_offline = true;
            return SyncResult::queued();
        }

        // This push supersedes any scheduled one.
        self.push_due = None;

        self.set_status(SyncStatus::Syncing, now_ms);
        let snapshot = self.current_snapshot(now_ms);
        let payload = ProjectPayload::from_snapshot(&snapshot);

        match self.remote.put_project(&project_id, &payload).await {
            Ok(updated) => {
                self.state.local_version = updated.version;
                self.state.server_version = updated.version;
                self.state.is_dirty = false;
                self.state.last_sync_time = Some(now_ms);
                self.state.last_error = None;
                self.created_at = updated.created_at;
                self.retry.reset();

                // Persisted local version follows the server-assigned one.
                if let Err(e) = self.store.save_project(&updated).await {
                    warn!(error = %e, "failed to persist accepted snapshot");
                }

                self.set_status(SyncStatus::Idle, now_ms);
                self.events.emit(SyncEvent::SyncCompleted {
                    version: updated.version,
                    timestamp: now_ms,
                });
                info!(project_id, version = updated.version, "push accepted");
                SyncResult::ok()
            }
            Err(e) => {
                let message = e.to_string();
                self.state.last_error = Some(message.clone());
                self.set_status(SyncStatus::Error, now_ms);
                let scheduled = self.retry.record_failure(now_ms);
                self.events.emit(SyncEvent::SyncFailed {
                    error: message.clone(),
                    will_retry: scheduled.is_some(),
                    timestamp: now_ms,
                });
                warn!(
                    project_id,
                    attempts = self.retry.attempts(),
                    will_retry = scheduled.is_some(),
                    error = %message,
                    "push failed"
                );
                SyncResult::failed(message)
            }
        }
    }

    // ==================== pull ====================

    /// Fetch the remote snapshot and reconcile.
    pub async fn pull_from_remote(&mut self, now_ms: u64) -> PullResult {
        let project_id = match &self.project_id {
            Some(id) => id.clone(),
            None => return PullResult::failed("not initialized"),
        };
        if !self.connectivity.is_online() {
            return PullResult::failed("offline");
        }

        match self.remote.fetch_project(&project_id).await {
            Ok(found) => self.apply_pull(found, now_ms).await,
            Err(e) => {
                let message = e.to_string();
                self.state.last_error = Some(message.clone());
                self.set_status(SyncStatus::Error, now_ms);
                warn!(project_id, error = %message, "pull failed");
                PullResult::failed(message)
            }
        }
    }

    /// Reconcile a fetched remote snapshot with local state.
    async fn apply_pull(&mut self, found: Option<ProjectSnapshot>, now_ms: u64) -> PullResult {
        let Some(remote_snap) = found else {
            // Not created remotely yet: success, nothing to adopt.
            self.state.server_version = 0;
            debug!("project not on remote yet");
            return PullResult::ok(0, false);
        };

        let observed_version = remote_snap.version;
        if observed_version <= self.state.server_version {
            return PullResult::ok(observed_version, false);
        }

        if !self.state.is_dirty {
            self.adopt_remote(remote_snap, now_ms).await;
            return PullResult::ok(observed_version, false);
        }

        let local_snap = self.current_snapshot(now_ms);
        if ConflictManager::detect(
            &local_snap,
            &remote_snap,
            self.state.local_version,
            observed_version,
        ) {
            let record = ConflictRecord {
                project_id: local_snap.id.clone(),
                local_version: self.state.local_version,
                server_version: observed_version,
                local_snapshot: local_snap,
                server_snapshot: remote_snap,
                detected_at: now_ms,
            };
            self.conflicts.begin(record);
            // Local state stays untouched until resolved; pushes are
            // withheld so the divergence cannot race upward.
            self.push_due = None;
            self.retry.cancel();
            self.events.emit(SyncEvent::ConflictDetected {
                local_version: self.state.local_version,
                server_version: observed_version,
                timestamp: now_ms,
            });
            info!(
                local_version = self.state.local_version,
                server_version = observed_version,
                "conflict detected"
            );
            return PullResult::ok(observed_version, true);
        }

        if local_snap.content_equal(&remote_snap) {
            // Version skew is metadata-only; adopt silently.
            self.adopt_remote(remote_snap, now_ms).await;
            PullResult::ok(observed_version, false)
        } else {
            // No conflict by the version rule (local is not behind), and
            // content differs: local wins, the next push supersedes.
            debug!(
                local_version = self.state.local_version,
                server_version = observed_version,
                "remote not ahead of local edits, keeping local state"
            );
            PullResult::ok(observed_version, false)
        }
    }

    /// Replace local state with an accepted remote snapshot.
    async fn adopt_remote(&mut self, snap: ProjectSnapshot, now_ms: u64) {
        self.surface.load_snapshot(&snap);
        self.state.local_version = snap.version;
        self.state.server_version = snap.version;
        self.state.is_dirty = false;
        self.created_at = snap.created_at;
        // Adoption supersedes any pending debounced work.
        self.save_due = None;
        self.push_due = None;

        if let Err(e) = self.store.save_project(&snap).await {
            warn!(error = %e, "failed to persist adopted snapshot");
        }
        self.events.emit(SyncEvent::RemoteAdopted {
            version: snap.version,
            timestamp: now_ms,
        });
        info!(version = snap.version, "adopted remote snapshot");
    }

    // ==================== conflicts ====================

    /// Resolve the active conflict and adopt the result.
    pub async fn resolve_conflict(
        &mut self,
        strategy: ResolutionStrategy,
        now_ms: u64,
    ) -> Result<()> {
        if self.project_id.is_none() {
            return Err(OrchestratorError::NotInitialized);
        }
        let server_version = match self.conflicts.active() {
            Some(record) => record.server_version,
            None => return Err(ConflictError::NoActiveConflict.into()),
        };

        let resolved = self.conflicts.resolve(strategy)?;
        self.surface.load_snapshot(&resolved);
        self.created_at = resolved.created_at;

        match strategy {
            ResolutionStrategy::AcceptServer => {
                self.state.local_version = resolved.version;
                self.state.server_version = resolved.version;
                self.state.is_dirty = false;
                self.save_due = None;
                self.push_due = None;
            }
            ResolutionStrategy::KeepLocal | ResolutionStrategy::Merge => {
                // Versioned past the server; re-mark dirty so the resolved
                // state is pushed upward.
                self.state.local_version = resolved.version;
                self.state.server_version = server_version;
                self.state.is_dirty = true;
                self.schedule_debounced(now_ms);
            }
        }

        if let Err(e) = self.store.save_project(&resolved).await {
            warn!(error = %e, "failed to persist resolved snapshot");
        }
        self.events.emit(SyncEvent::ConflictResolved {
            strategy: strategy.to_string(),
            version: resolved.version,
            timestamp: now_ms,
        });
        Ok(())
    }

    /// Drop the active conflict without adopting either side.
    pub fn cancel_conflict(&mut self) -> bool {
        self.conflicts.cancel().is_some()
    }

    // ==================== connectivity ====================

    /// Manual offline override.
    pub fn set_offline_mode(&mut self, offline: bool, now_ms: u64) {
        let transition = self.connectivity.set_manual_offline(offline);
        self.apply_transition(transition, now_ms);
    }

    /// Detected network state, fed by the host's probe or platform events.
    pub fn set_network_online(&mut self, online: bool, now_ms: u64) {
        let transition = self.connectivity.set_network_online(online);
        self.apply_transition(transition, now_ms);
    }

    fn apply_transition(&mut self, transition: Option<Transition>, now_ms: u64) {
        match transition {
            Some(Transition::WentOffline) => {
                if self.push_due.is_some() || self.retry.pending() {
                    self.push_pending_offline = true;
                }
                self.push_due = None;
                self.retry.cancel();
                self.state.is_online = false;
                self.set_status(SyncStatus::Offline, now_ms);
                info!("went offline");
            }
            Some(Transition::CameOnline) => {
                self.state.is_online = true;
                self.set_status(SyncStatus::Idle, now_ms);
                if (self.push_pending_offline || self.state.is_dirty)
                    && self.project_id.is_some()
                    && !self.conflicts.has_conflict()
                {
                    self.push_due = Some(now_ms + self.config.push_debounce_ms);
                    debug!("push rescheduled after reconnect");
                }
                self.push_pending_offline = false;
                info!("came online");
            }
            None => {}
        }
    }

    // ==================== crash recovery ====================

    /// Keep the crashed cache: re-mark it dirty so it is pushed upward.
    pub async fn recover_from_cache(&mut self, now_ms: u64) -> Result<()> {
        if self.project_id.is_none() {
            return Err(OrchestratorError::NotInitialized);
        }
        // The cache was already adopted during initialize.
        self.state.is_dirty = true;
        self.schedule_debounced(now_ms);
        if let Some(tracker) = &self.tracker {
            if let Err(e) = tracker.mark_active(&self.store, now_ms).await {
                warn!(error = %e, "session marker refresh failed");
            }
        }
        info!(version = self.state.local_version, "recovering from cache");
        Ok(())
    }

    /// Discard the crashed cache and use the remote copy (or start fresh
    /// when the project does not exist remotely).
    pub async fn discard_cache(&mut self, now_ms: u64) -> Result<()> {
        let project_id = match &self.project_id {
            Some(id) => id.clone(),
            None => return Err(OrchestratorError::NotInitialized),
        };

        self.store.clear_project_cache(&project_id).await?;
        self.state.is_dirty = false;
        self.state.local_version = 0;
        self.state.server_version = 0;
        self.save_due = None;
        self.push_due = None;

        let pulled = self.pull_from_remote(now_ms).await;
        if !(pulled.success && pulled.server_version > 0) {
            // Nothing usable on the remote either: start over.
            let snap =
                ProjectSnapshot::new_empty(&project_id, self.surface.project_name(), now_ms);
            self.store.save_project(&snap).await?;
            self.surface.load_snapshot(&snap);
            self.state.local_version = 1;
            self.state.server_version = 0;
            self.created_at = now_ms;
        }
        info!(project_id, "discarded cached snapshot");
        Ok(())
    }

    // ==================== internals ====================

    fn set_status(&mut self, status: SyncStatus, now_ms: u64) {
        if self.state.status != status {
            self.state.status = status;
            self.events.emit(SyncEvent::StatusChanged {
                status,
                timestamp: now_ms,
            });
        }
    }
}
