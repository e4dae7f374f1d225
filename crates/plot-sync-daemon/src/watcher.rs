//! Watcher for the editor's working file, with debouncing.
//!
//! Uses notify-debouncer-mini. The parent directory is watched rather than
//! the file itself because editors typically save by replacing the file,
//! which would break a direct file watch.

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Event for the watched working file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingFileEvent {
    /// File was created or modified
    Modified,
    /// File was deleted
    Deleted,
}

/// Debounced watcher for a single working file.
pub struct ProjectFileWatcher {
    file_path: PathBuf,
    /// Debouncer handle (must keep alive)
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    event_rx: mpsc::UnboundedReceiver<WorkingFileEvent>,
}

impl ProjectFileWatcher {
    /// Watch the working file with a 200ms debounce period, so editor save
    /// bursts collapse into one event.
    pub fn new(file_path: PathBuf) -> Result<Self> {
        let parent = file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        // Resolve symlinks; macOS FSEvents needs the real path.
        let parent = parent.canonicalize().unwrap_or(parent);
        let file_name = file_path.file_name().map(|n| n.to_os_string());

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    for event in events {
                        // Only the working file matters
                        if event.path.file_name().map(|n| n.to_os_string()) != file_name {
                            continue;
                        }
                        let file_event = if event.path.exists() {
                            WorkingFileEvent::Modified
                        } else {
                            WorkingFileEvent::Deleted
                        };
                        debug!(?file_event, path = %event.path.display(), "working file event");
                        if event_tx.send(file_event).is_err() {
                            // Receiver dropped
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("file watcher error: {}", e);
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&parent, RecursiveMode::NonRecursive)?;

        Ok(Self {
            file_path,
            _debouncer: debouncer,
            event_rx,
        })
    }

    /// Receive the next file event.
    pub async fn next_event(&mut self) -> Option<WorkingFileEvent> {
        self.event_rx.recv().await
    }

    pub fn file_path(&self) -> &PathBuf {
        &self.file_path
    }
}

/// Time-to-live for write-back flags. Flags older than this are stale.
const WRITEBACK_TTL: Duration = Duration::from_secs(5);

/// Guards against write-back echoes.
///
/// The agent writes adopted snapshots back to the working file; the watcher
/// then fires for the agent's own write. Call `mark` before writing and
/// `consume` when a file event arrives: a fresh flag means the event is an
/// echo and must not be fed back into `mark_dirty`. The TTL keeps a dropped
/// watcher event from suppressing a later genuine edit.
#[derive(Clone, Default)]
pub struct WritebackGuard {
    marked_at: Arc<Mutex<Option<Instant>>>,
}

impl WritebackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark that a write-back is about to happen.
    pub fn mark(&self) {
        *self.marked_at.lock().unwrap() = Some(Instant::now());
    }

    /// Check and consume the flag. Returns true at most once per `mark`,
    /// and only within the TTL.
    pub fn consume(&self) -> bool {
        let mut guard = self.marked_at.lock().unwrap();
        match guard.take() {
            Some(marked) if marked.elapsed() < WRITEBACK_TTL => true,
            _ => false,
        }
    }
}
