//! Storage backend selection.

use serde::Deserialize;

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Everything lives in process memory and is lost on exit.
    #[default]
    Memory,
    /// SQLite file at `path`.
    Sqlite {
        #[serde(default = "default_database_path")]
        path: String,
    },
}

fn default_database_path() -> String {
    "racetrack.db".to_string()
}
