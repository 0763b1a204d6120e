//! Saving generated code to disk.
//!
//! A pre-existing file at the target path is renamed to a timestamped
//! backup before the new content is written; nothing is ever silently
//! overwritten.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What `save_code` did with the target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SaveOutcome {
    /// Content written to a fresh path.
    Saved,
    /// The previous file was moved to this backup path first.
    SavedWithBackup(PathBuf),
    /// Nothing to save; no file was touched.
    SkippedEmpty,
}

/// Writes `code` to `path`, creating parent directories and backing up any
/// existing file as `<path>.<timestamp>.bak` first.
pub(crate) fn save_code(code: &str, path: &Path) -> Result<SaveOutcome> {
    if code.trim().is_empty() {
        warn!("No code generated; skipping file saving");
        return Ok(SaveOutcome::SkippedEmpty);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let backup = if path.exists() {
        let timestamp = Local::now().format("%Y%m%d%H%M%S");
        let backup_path = PathBuf::from(format!("{}.{timestamp}.bak", path.display()));
        fs::rename(path, &backup_path).with_context(|| {
            format!(
                "Failed to back up existing file {} to {}",
                path.display(),
                backup_path.display()
            )
        })?;
        info!("Backed up existing file to {}", backup_path.display());
        Some(backup_path)
    } else {
        None
    };

    fs::write(path, code)
        .with_context(|| format!("Failed to write code to {}", path.display()))?;

    // Read-back check: a short write here means a broken artifact later.
    let written = fs::read_to_string(path)
        .with_context(|| format!("Failed to verify saved file {}", path.display()))?;
    if written != code {
        warn!("Saved content does not match generated code");
    }

    info!("Code saved to {}", path.display());

    Ok(match backup {
        Some(backup_path) => SaveOutcome::SavedWithBackup(backup_path),
        None => SaveOutcome::Saved,
    })
}
