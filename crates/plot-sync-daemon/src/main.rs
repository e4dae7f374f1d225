//! plot-sync-daemon: Headless sync agent for lighting plot documents.
//!
//! Keeps an editor's working file in sync with the remote project server
//! through the plot-sync-core engine: edits to the file are debounced into
//! pushes, adopted remote snapshots are written back, the cache directory
//! makes edits survive offline stretches and crashes.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use plot_sync_daemon::project_file;
use plot_sync_daemon::{DiskStore, HttpRemote, ProjectFileWatcher, WorkingFileEvent, WritebackGuard};

use plot_sync_core::conflict::ResolutionStrategy;
use plot_sync_core::events::SyncEvent;
use plot_sync_core::orchestrator::{SyncConfig, SyncOrchestrator};
use plot_sync_core::surface::InMemorySurface;

#[derive(Parser, Debug)]
#[command(name = "plot-sync-daemon")]
#[command(about = "Headless sync agent for lighting plot documents")]
struct Args {
    /// Project id on the remote server
    #[arg(short, long)]
    project: String,

    /// Path to the editor's working file
    #[arg(short, long)]
    file: PathBuf,

    /// Directory for the local cache and session markers
    #[arg(long, default_value = ".plot-sync")]
    cache_dir: PathBuf,

    /// Base URL of the project server
    #[arg(short, long, default_value = "http://localhost:4000/api")]
    server: String,

    /// Scheduler tick interval in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Connectivity probe interval in seconds
    #[arg(long, default_value_t = 30)]
    probe_secs: u64,

    /// Remote pull interval in seconds
    #[arg(long, default_value_t = 60)]
    pull_secs: u64,

    /// Start in manual offline mode (no network calls until cleared)
    #[arg(long)]
    offline: bool,

    /// Policy when an unclean shutdown left newer local state
    #[arg(long, value_enum, default_value = "recover")]
    on_crash: CrashPolicy,

    /// Resolution applied when a pull detects divergent edits
    #[arg(long, value_enum, default_value = "merge")]
    on_conflict: ConflictPolicy,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

/// What to do with a crash-recovery offer. A GUI host would ask the user;
/// the headless agent applies a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CrashPolicy {
    /// Keep the cached edits and push them to the server
    Recover,
    /// Drop the cache and adopt the server copy
    Discard,
}

/// What to do when a pull detects divergent edits. A GUI host would show a
/// resolution dialog; the headless agent applies a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConflictPolicy {
    /// Take the server copy, dropping local divergence
    AcceptServer,
    /// Keep the local copy and push it over the server's
    KeepLocal,
    /// Union of both sides, server content winning per entry
    Merge,
}

impl ConflictPolicy {
    fn strategy(self) -> ResolutionStrategy {
        match self {
            ConflictPolicy::AcceptServer => ResolutionStrategy::AcceptServer,
            ConflictPolicy::KeepLocal => ResolutionStrategy::KeepLocal,
            ConflictPolicy::Merge => ResolutionStrategy::Merge,
        }
    }
}

/// Wall clock in unix milliseconds, the time base the engine runs on.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

type Engine = SyncOrchestrator<DiskStore, HttpRemote, InMemorySurface>;

/// Agent state tying the engine to the working file.
struct Agent {
    engine: Engine,
    file_path: PathBuf,
    guard: WritebackGuard,
}

impl Agent {
    /// Handle a change to the working file: reload the surface and mark
    /// the document dirty, unless this is an echo of our own write-back.
    async fn on_file_event(&mut self, event: WorkingFileEvent) {
        match event {
            WorkingFileEvent::Modified => {
                if self.guard.consume() {
                    debug!("write-back echo, skipping");
                    return;
                }
                match project_file::read_payload(&self.file_path).await {
                    Ok(payload) => {
                        if payload == project_file::payload_from_surface(self.engine.surface()) {
                            debug!("working file unchanged, skipping");
                            return;
                        }
                        project_file::apply_payload(self.engine.surface_mut(), &payload);
                        if let Err(e) = self.engine.mark_dirty(now_millis()).await {
                            warn!(error = %e, "failed to mark edit");
                        } else {
                            debug!(
                                version = self.engine.state().local_version,
                                "working file edit recorded"
                            );
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to read working file"),
                }
            }
            WorkingFileEvent::Deleted => {
                // The cache still has the last persisted state; keep syncing
                // from memory and let the next adoption recreate the file.
                warn!(path = %self.file_path.display(), "working file deleted");
            }
        }
    }

    /// Write the current surface state back to the working file after an
    /// adoption (remote update or conflict resolution).
    async fn write_back(&mut self, version: u64) {
        let payload = project_file::payload_from_surface(self.engine.surface());
        self.guard.mark();
        match project_file::write_payload(&self.file_path, &payload).await {
            Ok(()) => info!(version, "adopted snapshot written to working file"),
            Err(e) => warn!(error = %e, "failed to write working file"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        project = %args.project,
        file = %args.file.display(),
        server = %args.server,
        "starting plot-sync agent"
    );

    let store = DiskStore::new(&args.cache_dir);
    let remote = HttpRemote::new(&args.server)?;
    let probe_remote = remote.clone();
    let surface = InMemorySurface::new(&args.project);

    let mut engine = SyncOrchestrator::new(store, remote, surface, SyncConfig::default());
    if args.offline {
        engine.set_offline_mode(true, now_millis());
    }

    // Initialize: adopt cache or create fresh, detect unclean shutdowns.
    let recovery = engine.initialize(&args.project, now_millis()).await?;
    if let Some(info) = recovery {
        info!(
            cached_version = info.cached_version,
            remote_version = info.remote_version,
            policy = ?args.on_crash,
            "previous session did not shut down cleanly"
        );
        match args.on_crash {
            CrashPolicy::Recover => engine.recover_from_cache(now_millis()).await?,
            CrashPolicy::Discard => engine.discard_cache(now_millis()).await?,
        }
    }

    // Reconcile the working file with the adopted state. The watcher is
    // not running yet, so this write cannot echo.
    if tokio::fs::try_exists(&args.file).await.unwrap_or(false) {
        match project_file::read_payload(&args.file).await {
            Ok(payload) => {
                if payload != project_file::payload_from_surface(engine.surface()) {
                    info!("working file differs from adopted state, syncing it up");
                    project_file::apply_payload(engine.surface_mut(), &payload);
                    engine.mark_dirty(now_millis()).await?;
                }
            }
            Err(e) => warn!(error = %e, "working file unreadable, leaving it alone"),
        }
    } else {
        let payload = project_file::payload_from_surface(engine.surface());
        project_file::write_payload(&args.file, &payload).await?;
        info!(path = %args.file.display(), "created working file");
    }

    // Adoptions flow back to the working file, and conflicts to the
    // resolution policy, via the event bus.
    let (adopt_tx, mut adopt_rx) = mpsc::unbounded_channel();
    let (conflict_tx, mut conflict_rx) = mpsc::unbounded_channel();
    let bus = engine.events();
    let _subscription = bus.subscribe(move |event| match event {
        SyncEvent::RemoteAdopted { version, .. } | SyncEvent::ConflictResolved { version, .. } => {
            let _ = adopt_tx.send(version);
        }
        SyncEvent::StatusChanged { status, .. } => info!(%status, "sync status"),
        SyncEvent::SyncCompleted { version, .. } => debug!(version, "sync completed"),
        SyncEvent::SyncFailed {
            error, will_retry, ..
        } => warn!(%error, will_retry, "sync failed"),
        SyncEvent::ConflictDetected {
            local_version,
            server_version,
            ..
        } => {
            warn!(local_version, server_version, "conflict detected");
            let _ = conflict_tx.send(());
        }
        SyncEvent::RecoveryAvailable { .. } => {}
    });

    engine.start();

    let mut watcher = ProjectFileWatcher::new(args.file.clone())?;
    let mut agent = Agent {
        engine,
        file_path: args.file.clone(),
        guard: WritebackGuard::new(),
    };

    let mut tick = tokio::time::interval(Duration::from_millis(args.tick_ms));
    let mut probe = tokio::time::interval(Duration::from_secs(args.probe_secs));
    let mut pull = tokio::time::interval(Duration::from_secs(args.pull_secs));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                agent.engine.tick(now_millis()).await?;
            }
            _ = probe.tick() => {
                if !args.offline {
                    let online = probe_remote.check_health().await;
                    agent.engine.set_network_online(online, now_millis());
                }
            }
            _ = pull.tick() => {
                if agent.engine.state().is_online {
                    let _ = agent.engine.pull_from_remote(now_millis()).await;
                }
            }
            Some(event) = watcher.next_event() => {
                agent.on_file_event(event).await;
            }
            Some(()) = conflict_rx.recv() => {
                let strategy = args.on_conflict.strategy();
                info!(%strategy, "applying conflict policy");
                if let Err(e) = agent.engine.resolve_conflict(strategy, now_millis()).await {
                    warn!(error = %e, "conflict resolution failed");
                }
            }
            Some(version) = adopt_rx.recv() => {
                agent.write_back(version).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    agent.engine.dispose(now_millis()).await?;
    // Safety net for teardown paths where the runtime is already gone.
    agent.engine.write_clean_shutdown_blocking(now_millis());
    Ok(())
}
