use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::lib_constants::COMMAND_QUEUE_DEPTH;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AppConfig {
    /// Root of all persistent state: one subdirectory of note blobs per
    /// user, plus the metadata snapshot file.
    pub data_directory: PathBuf,
    pub snapshot_interval_secs: u64,
    pub command_queue_depth: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_directory: PathBuf::from("/var/db/scrapnote"),
            snapshot_interval_secs: 60,
            command_queue_depth: COMMAND_QUEUE_DEPTH,
        }
    }
}

impl AppConfig {
    /// The metadata snapshot lives next to the user directories; usernames
    /// start with a letter, so the underscore name cannot collide.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_directory.join("_db")
    }
}
