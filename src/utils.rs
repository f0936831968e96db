//! Utility functions for panel-index
//!
//! File-system helpers shared by the store, the integrity guard and the CLI.

use crate::error::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Format file size in human readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Create directory if it doesn't exist
pub fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    Ok(())
}

/// Timestamp used in backup file names: `YYYYMMDD-HHMMSS`
pub fn backup_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// `<dir>/<file name>.<timestamp>.bak`
pub fn backup_file_path(file: &Path, dir: &Path, at: DateTime<Local>) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index".to_string());
    dir.join(format!("{}.{}.bak", name, backup_timestamp(at)))
}

/// The index file plus its WAL and shared-memory side files
pub fn index_file_set(file: &Path) -> [PathBuf; 3] {
    let with_suffix = |suffix: &str| {
        let mut name = file.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    };
    [file.to_path_buf(), with_suffix("-wal"), with_suffix("-shm")]
}

/// Delete the index file and its side files; missing files are not an error
pub fn remove_index_files(file: &Path) -> Result<()> {
    for path in index_file_set(file) {
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_file_size_formatting() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
        assert_eq!(format_file_size(1073741824), "1.0 GB");
    }

    #[test]
    fn test_backup_file_path() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        let path = backup_file_path(
            Path::new("/p/.panelindex/index.db"),
            Path::new("/p/.panelindex/backups"),
            at,
        );
        assert_eq!(
            path,
            PathBuf::from("/p/.panelindex/backups/index.db.20240309-070502.bak")
        );
    }

    #[test]
    fn test_index_file_set() {
        let [db, wal, shm] = index_file_set(Path::new("/p/index.db"));
        assert_eq!(db, PathBuf::from("/p/index.db"));
        assert_eq!(wal, PathBuf::from("/p/index.db-wal"));
        assert_eq!(shm, PathBuf::from("/p/index.db-shm"));
    }

    #[test]
    fn test_remove_index_files_tolerates_missing() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("index.db");
        std::fs::write(&db, b"x").unwrap();
        std::fs::write(dir.path().join("index.db-wal"), b"x").unwrap();

        remove_index_files(&db).unwrap();
        assert!(!db.exists());
        assert!(!dir.path().join("index.db-wal").exists());
    }

    #[test]
    fn test_ensure_directory_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_directory(&nested).unwrap();
    }
}
