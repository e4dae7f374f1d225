//! plot-sync-daemon library: Exposes internal modules for testing.
//!
//! This is a thin library layer over the agent components, allowing
//! integration tests to access internal types.

pub mod disk_store;
pub mod http_remote;
pub mod project_file;
pub mod watcher;

// Re-export key types for convenience
pub use disk_store::DiskStore;
pub use http_remote::HttpRemote;
pub use watcher::{ProjectFileWatcher, WorkingFileEvent, WritebackGuard};
