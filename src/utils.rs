//! Shared utility functions for locating and opening the note database.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::Database;

/// Environment variable overriding the database location.
pub const DB_PATH_VAR: &str = "UMBRA_DB";

/// Gets the cross-platform database path.
///
/// Returns `UMBRA_DB` when set, otherwise `{data_dir}/umbra/notes.db` where
/// `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_database_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(DB_PATH_VAR).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("umbra").join("notes.db"))
}

/// Ensures the parent directory of the database file exists.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

/// Opens the database at `path`, creating its directory first.
pub fn open_database(path: &Path) -> Result<Database> {
    ensure_database_directory(path)?;
    Database::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}
