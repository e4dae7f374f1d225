//! End-to-end engine cycles over the real disk store.
//!
//! These tests wire the daemon's `DiskStore` to the core's in-memory
//! remote and drive the orchestrator the way the agent's tick loop does,
//! with an explicit clock so debounce windows are deterministic.

use plot_sync_core::orchestrator::{SyncConfig, SyncOrchestrator, SyncStatus};
use plot_sync_core::remote::InMemoryRemote;
use plot_sync_core::snapshot::{Annotation, Point};
use plot_sync_core::store::LocalStore;
use plot_sync_core::surface::{EditingSurface, InMemorySurface};
use plot_sync_core::ResolutionStrategy;
use plot_sync_daemon::DiskStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

type Engine = SyncOrchestrator<DiskStore, Arc<InMemoryRemote>, InMemorySurface>;

fn engine(cache_dir: &Path, remote: Arc<InMemoryRemote>) -> Engine {
    SyncOrchestrator::new(
        DiskStore::new(cache_dir),
        remote,
        InMemorySurface::new("Winter Tour Plot"),
        SyncConfig::default(),
    )
}

fn annotation(id: &str, text: &str) -> Annotation {
    Annotation {
        id: id.to_string(),
        text: text.to_string(),
        location: Point::new(1.0, 2.0),
        font_size: 12.0,
    }
}

#[tokio::test]
async fn test_edit_debounce_push_cycle_over_disk() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());

    let mut engine = engine(dir.path(), Arc::clone(&remote));
    engine.initialize("tour-1", 1_000).await.unwrap();
    engine.start();

    // Edit lands in the surface, then the engine hears about it
    engine
        .surface_mut()
        .layers_mut()
        .annotations
        .insert("n1".to_string(), annotation("n1", "spot op enters here"));
    engine.mark_dirty(1_010).await.unwrap();

    // Local save fires inside the short window
    engine.tick(1_060).await.unwrap();
    let cached = engine.store().load_project("tour-1").await.unwrap().unwrap();
    assert!(cached.layers.annotations.contains_key("n1"));

    // Push fires inside the long window
    engine.tick(1_510).await.unwrap();
    assert!(!engine.state().is_dirty);
    assert_eq!(engine.state().status, SyncStatus::Idle);
    assert_eq!(engine.state().server_version, 1);

    // The accepted snapshot is on disk with the server-assigned version
    let cached = engine.store().load_project("tour-1").await.unwrap().unwrap();
    assert_eq!(cached.version, 1);
}

#[tokio::test]
async fn test_crash_recovery_across_sessions() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());

    // Session 1: edits are saved locally but the process dies before
    // dispose, leaving an unclean marker behind.
    {
        let mut engine = engine(dir.path(), Arc::clone(&remote));
        engine.initialize("tour-1", 1_000).await.unwrap();
        engine.start();
        engine
            .surface_mut()
            .layers_mut()
            .annotations
            .insert("n1".to_string(), annotation("n1", "unsaved edit"));
        engine.mark_dirty(1_010).await.unwrap();
        engine.tick(1_060).await.unwrap(); // local save only, no push yet
        // dropped without dispose
    }

    // Session 2: the unclean shutdown is detected and recovery offered.
    let mut engine2 = engine(dir.path(), Arc::clone(&remote));
    let info = engine2.initialize("tour-1", 5_000).await.unwrap().unwrap();
    assert_eq!(info.cached_version, 2);
    assert_eq!(info.remote_version, 0);
    engine2.start();

    // Recovering pushes the crashed edits upward
    engine2.recover_from_cache(5_100).await.unwrap();
    engine2.tick(5_600).await.unwrap();
    let stored = remote.stored("tour-1").unwrap();
    assert!(stored.layers.annotations.contains_key("n1"));

    // Orderly dispose clears the unclean state for the next session
    engine2.dispose(6_000).await.unwrap();
    let marker = engine2
        .store()
        .load_session_marker("tour-1")
        .await
        .unwrap()
        .unwrap();
    assert!(marker.clean_shutdown);
}

#[tokio::test]
async fn test_crash_discard_adopts_remote() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());

    // Another client owns the authoritative copy
    let mut authoritative = plot_sync_core::ProjectSnapshot::new_empty("tour-1", "Stage Copy", 500);
    authoritative.version = 4;
    authoritative
        .layers
        .annotations
        .insert("server".to_string(), annotation("server", "from the server"));
    remote.seed_project(authoritative);

    // Session 1 crashes with local edits
    {
        let mut engine = engine(dir.path(), Arc::clone(&remote));
        engine.initialize("tour-1", 1_000).await.unwrap();
        engine.start();
        engine.mark_dirty(1_010).await.unwrap();
        engine.tick(1_060).await.unwrap();
    }

    // Session 2 discards the crashed cache
    let mut engine2 = engine(dir.path(), Arc::clone(&remote));
    assert!(engine2.initialize("tour-1", 5_000).await.unwrap().is_some());
    engine2.start();
    engine2.discard_cache(5_100).await.unwrap();

    assert_eq!(engine2.state().server_version, 4);
    assert!(engine2
        .surface()
        .layers()
        .annotations
        .contains_key("server"));
}

#[tokio::test]
async fn test_offline_edits_survive_and_push_on_reconnect() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());

    let mut engine = engine(dir.path(), Arc::clone(&remote));
    engine.initialize("tour-1", 1_000).await.unwrap();
    engine.start();

    engine.set_network_online(false, 1_005);
    engine
        .surface_mut()
        .layers_mut()
        .annotations
        .insert("n1".to_string(), annotation("n1", "offline edit"));
    engine.mark_dirty(1_010).await.unwrap();

    // Local persistence is independent of the network
    engine.tick(1_060).await.unwrap();
    let cached = engine.store().load_project("tour-1").await.unwrap().unwrap();
    assert!(cached.layers.annotations.contains_key("n1"));
    assert!(remote.stored("tour-1").is_none());
    assert_eq!(engine.state().status, SyncStatus::Offline);

    // Reconnect: exactly one push goes out
    engine.set_network_online(true, 10_000);
    engine.tick(10_500).await.unwrap();
    engine.tick(20_000).await.unwrap();
    assert_eq!(remote.put_count(), 1);
    let stored = remote.stored("tour-1").unwrap();
    assert!(stored.layers.annotations.contains_key("n1"));
}

#[tokio::test]
async fn test_conflict_resolution_round_trip_over_disk() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryRemote::new());

    let mut engine = engine(dir.path(), Arc::clone(&remote));
    engine.initialize("tour-1", 1_000).await.unwrap();
    engine.start();

    // Local divergence
    engine
        .surface_mut()
        .layers_mut()
        .annotations
        .insert("local".to_string(), annotation("local", "mine"));
    engine.mark_dirty(1_010).await.unwrap();

    // Remote divergence, strictly ahead
    let mut theirs = plot_sync_core::ProjectSnapshot::new_empty("tour-1", "Winter Tour Plot", 500);
    theirs.version = 5;
    theirs
        .layers
        .annotations
        .insert("remote".to_string(), annotation("remote", "theirs"));
    remote.seed_project(theirs);

    let pulled = engine.pull_from_remote(2_000).await;
    assert!(pulled.conflict);

    // Merge keeps both sides, server content authoritative per entry
    engine
        .resolve_conflict(ResolutionStrategy::Merge, 3_000)
        .await
        .unwrap();
    let layers = engine.surface().layers();
    assert!(layers.annotations.contains_key("local"));
    assert!(layers.annotations.contains_key("remote"));

    // The merged result is persisted and then pushed
    let cached = engine.store().load_project("tour-1").await.unwrap().unwrap();
    assert_eq!(cached.version, 6);
    engine.tick(3_600).await.unwrap();
    let stored = remote.stored("tour-1").unwrap();
    assert_eq!(stored.version, 6);
    assert!(stored.layers.annotations.contains_key("local"));
}
