//! plot-sync-core: Local-first sync engine for lighting plot documents.
//!
//! This crate keeps an interactively edited plot consistent between three
//! places: the in-memory editing surface, a durable local cache, and the
//! authoritative remote project server. It tolerates intermittent
//! connectivity, concurrent edits on both ends, and abrupt process
//! termination.
//!
//! The externals are trait seams with in-memory doubles for tests:
//! - [`store::LocalStore`] - durable local cache + crash-recovery markers
//! - [`remote::RemoteClient`] - fetch/replace-whole-document remote access
//! - [`surface::EditingSurface`] - the live editing state
//!
//! [`orchestrator::SyncOrchestrator`] composes everything: debounced local
//! saves and remote pushes, conflict detection and resolution, linear retry
//! backoff, offline gating, and crash recovery.

pub mod conflict;
pub mod connectivity;
pub mod diff;
pub mod events;
pub mod orchestrator;
pub mod recovery;
pub mod remote;
pub mod retry;
pub mod snapshot;
pub mod store;
pub mod surface;

pub use conflict::{ConflictManager, ConflictRecord, ResolutionStrategy};
pub use connectivity::ConnectivityMonitor;
pub use diff::{diff_layers, DiffResult};
pub use events::{EventBus, Subscription, SyncEvent};
pub use orchestrator::{
    PullResult, SyncConfig, SyncOrchestrator, SyncResult, SyncState, SyncStatus,
};
pub use recovery::{CrashRecoveryTracker, RecoveryInfo, RecoverySession};
pub use remote::{InMemoryRemote, ProjectPayload, RemoteClient};
pub use snapshot::{LayerSet, ProjectSnapshot};
pub use store::{InMemoryStore, LocalStore};
pub use surface::{EditingSurface, InMemorySurface};
