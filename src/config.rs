//! Configuration for huffpack

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Capacity of the buffered readers/writers around every file.
    pub io_buffer_size: usize,
    /// Where extracted files are created.
    pub output_dir: PathBuf,
    /// Truncate files that already exist when extracting.
    pub overwrite_existing: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            io_buffer_size: 65536,
            output_dir: PathBuf::from("."),
            overwrite_existing: true,
        }
    }
}

impl ArchiveConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ArchiveError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ArchiveError::Config(e.to_string()))?;
        if config.io_buffer_size == 0 {
            return Err(ArchiveError::Config("io_buffer_size must be positive".into()));
        }
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ArchiveError> {
        let json = std::fs::read_to_string(path).map_err(|source| ArchiveError::FileOpenFailure {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
