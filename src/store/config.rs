//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default database file name inside the data directory.
pub const DATABASE_FILE: &str = "pageturn.db";

/// Configuration for a page store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory for data storage.
    pub data_dir: PathBuf,

    /// Database file name within `data_dir`.
    pub file_name: String,

    /// How long a write waits on a locked database before failing.
    pub busy_timeout: Duration,

    /// Normalize leftover placeholder positions when the store opens.
    pub repair_on_open: bool,
}

impl StoreConfig {
    /// Create a new config rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            file_name: DATABASE_FILE.to_string(),
            busy_timeout: Duration::from_secs(5),
            repair_on_open: true,
        }
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    /// Set the database file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable the repair pass on open.
    pub fn with_repair_on_open(mut self, repair: bool) -> Self {
        self.repair_on_open = repair;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("app", "pageturn", "pageturn")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".pageturn"));

        Self::new(data_dir)
    }
}
