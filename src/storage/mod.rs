// Storage engines implementing the `Dao` port.

pub mod lsm;
pub mod memory;
pub mod memtable;
pub mod sstable;

use crate::utils::error::{KvError, Result};
use std::fs;
use std::path::Path;

/// Creates `dir` if missing and rejects paths that exist but are not directories.
pub fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        tracing::info!("Created data directory {}", dir.display());
    }
    if !dir.is_dir() {
        return Err(KvError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}
