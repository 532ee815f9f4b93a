//! Content store configuration.

use serde::{Deserialize, Serialize};

/// Local filesystem content store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all runtime data.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Subdirectory of `data_dir` holding file contents.
    #[serde(default = "default_files_prefix")]
    pub files_prefix: String,
    /// Chunk size in bytes for the copy loop; also controls how often the
    /// cancellation signal is observed while a file is stored.
    #[serde(default = "default_throughput")]
    pub throughput_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            files_prefix: default_files_prefix(),
            throughput_bytes: default_throughput(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_files_prefix() -> String {
    "files".to_string()
}

fn default_throughput() -> usize {
    32_768 // 32 KiB
}
