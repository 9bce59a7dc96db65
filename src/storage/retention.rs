//! Log directory retention
//!
//! Creates log directories and sweeps out files older than the retention window.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{Error, Result};

/// Default maximum age, in hours, of files kept when a directory is reused
pub const DEFAULT_MAX_AGE_HOURS: u64 = 8;

/// Outcome of a retention sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of files removed
    pub deleted: usize,
    /// Files that were due for removal but could not be deleted
    pub failed: Vec<PathBuf>,
}

/// Make sure `path` exists as a directory
///
/// A missing directory tree is created. An existing one is swept with
/// `max_age_hours`. A path that exists but is not a directory is an error.
pub fn ensure_directory(path: &Path, max_age_hours: u64) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
        return Ok(());
    }

    if !path.is_dir() {
        return Err(Error::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ),
        ));
    }

    let report = sweep(path, max_age_hours)?;
    if report.deleted > 0 {
        tracing::debug!(
            "Swept {} old log file(s) from {}",
            report.deleted,
            path.display()
        );
    }
    tracing::debug!("Using existing log directory: {}", path.display());

    Ok(())
}

/// Delete regular files in `path` last modified more than `max_age_hours` ago
///
/// Sub-directories are left alone. A file that cannot be deleted is reported
/// and recorded in the returned report; the sweep carries on.
pub fn sweep(path: &Path, max_age_hours: u64) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    if !path.exists() {
        return Ok(report);
    }

    let max_age = Duration::from_secs(max_age_hours.saturating_mul(60 * 60));
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        let file_path = entry.path();

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        // Check file modification time
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&file_path) {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                tracing::warn!("File not deleted: {}: {}", file_path.display(), e);
                report.failed.push(file_path);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn file_aged(dir: &Path, name: &str, hours: u64) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(b"test log content").unwrap();
        let modified = SystemTime::now() - Duration::from_secs(hours * 60 * 60);
        file.set_modified(modified).unwrap();
        path
    }

    #[test]
    fn test_sweep_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let report = sweep(temp_dir.path(), DEFAULT_MAX_AGE_HOURS).unwrap();
        assert_eq!(report.deleted, 0);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_sweep_nonexistent_dir() {
        let path = Path::new("/nonexistent/path/for/testing");
        let report = sweep(path, DEFAULT_MAX_AGE_HOURS).unwrap();
        assert_eq!(report.deleted, 0);
    }

    #[test]
    fn test_sweep_removes_only_expired_files() {
        let temp_dir = TempDir::new().unwrap();

        let recent = file_aged(temp_dir.path(), "recent.log", 1);
        let older = file_aged(temp_dir.path(), "older.log", 9);
        let oldest = file_aged(temp_dir.path(), "oldest.log", 20);

        let report = sweep(temp_dir.path(), 8).unwrap();
        assert_eq!(report.deleted, 2);

        assert!(recent.exists());
        assert!(!older.exists());
        assert!(!oldest.exists());
    }

    #[test]
    fn test_sweep_leaves_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("archive");
        fs::create_dir(&nested).unwrap();
        let inner = file_aged(&nested, "inner.log", 20);

        let report = sweep(temp_dir.path(), 8).unwrap();
        assert_eq!(report.deleted, 0);
        assert!(nested.is_dir());
        assert!(inner.exists());
    }

    #[test]
    fn test_sweep_with_huge_window_keeps_everything() {
        let temp_dir = TempDir::new().unwrap();
        let old = file_aged(temp_dir.path(), "old.log", 100);

        let report = sweep(temp_dir.path(), u64::MAX / 100).unwrap();
        assert_eq!(report.deleted, 0);
        assert!(old.exists());

        ensure_directory(temp_dir.path(), u64::MAX).unwrap();
        assert!(old.exists());
    }

    #[test]
    fn test_ensure_directory_creates_tree() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a").join("b").join("catalog");

        ensure_directory(&target, DEFAULT_MAX_AGE_HOURS).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_ensure_directory_sweeps_existing() {
        let temp_dir = TempDir::new().unwrap();
        let stale = file_aged(temp_dir.path(), "stale.log", 30);
        let fresh = file_aged(temp_dir.path(), "fresh.log", 0);

        ensure_directory(temp_dir.path(), DEFAULT_MAX_AGE_HOURS).unwrap();
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_ensure_directory_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("not-a-dir");
        File::create(&path).unwrap();

        let result = ensure_directory(&path, DEFAULT_MAX_AGE_HOURS);
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
