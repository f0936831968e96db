//! Configuration for the project index
//!
//! Everything here has a sensible default; callers normally only override the
//! file layout or the search limits. The value is passed explicitly to
//! `IndexStore::open_with` rather than read from any global.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Index layout, connection and search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Hidden per-project directory holding the index
    pub dir_name: String,

    /// Fixed index file name inside `dir_name`
    pub file_name: String,

    /// Subdirectory (inside `dir_name`) for corrupt-file backups
    pub backup_dir: String,

    /// How long a locked file is retried before failing
    pub busy_timeout_ms: u64,

    /// SQLite VM steps between cancellation checks
    pub progress_ops: i32,

    /// Result limit used when the caller asks for zero
    pub default_limit: usize,

    /// Upper bound on any requested limit
    pub max_limit: usize,

    /// Tokens of context in each snippet
    pub snippet_tokens: i32,

    /// Marker inserted before a matched term in snippets
    pub snippet_open: String,

    /// Marker inserted after a matched term in snippets
    pub snippet_close: String,

    /// Marker for elided text in snippets
    pub snippet_ellipsis: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir_name: ".panelindex".to_string(),
            file_name: "index.db".to_string(),
            backup_dir: "backups".to_string(),
            busy_timeout_ms: 5_000,
            progress_ops: 1_000,
            default_limit: 50,
            max_limit: 500,
            snippet_tokens: 12,
            snippet_open: String::new(),
            snippet_close: String::new(),
            snippet_ellipsis: "…".to_string(),
        }
    }
}

impl IndexConfig {
    /// Load overrides from a JSON file; missing keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the index unusable
    pub fn validate(&self) -> Result<()> {
        if self.dir_name.trim().is_empty() || self.file_name.trim().is_empty() {
            return Err(IndexError::Config(
                "dir_name and file_name must not be empty".to_string(),
            ));
        }
        if self.default_limit == 0 || self.max_limit == 0 {
            return Err(IndexError::Config("search limits must be positive".to_string()));
        }
        if self.default_limit > self.max_limit {
            return Err(IndexError::Config(format!(
                "default_limit {} exceeds max_limit {}",
                self.default_limit, self.max_limit
            )));
        }
        if self.progress_ops <= 0 {
            return Err(IndexError::Config("progress_ops must be positive".to_string()));
        }
        if !(1..=64).contains(&self.snippet_tokens) {
            return Err(IndexError::Config(
                "snippet_tokens must be between 1 and 64".to_string(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// `<root>/<dir_name>`
    pub fn index_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.dir_name)
    }

    /// `<root>/<dir_name>/<file_name>`
    pub fn index_path(&self, root: &Path) -> PathBuf {
        self.index_dir(root).join(&self.file_name)
    }

    /// `<root>/<dir_name>/<backup_dir>`
    pub fn backup_path(&self, root: &Path) -> PathBuf {
        self.index_dir(root).join(&self.backup_dir)
    }

    /// Clamp a requested limit into `1..=max_limit`, mapping 0 to the default
    pub fn effective_limit(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_limit
        } else {
            requested.min(self.max_limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = IndexConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_paths() {
        let config = IndexConfig::default();
        let root = Path::new("/projects/night-shift");
        assert_eq!(
            config.index_path(root),
            PathBuf::from("/projects/night-shift/.panelindex/index.db")
        );
        assert_eq!(
            config.backup_path(root),
            PathBuf::from("/projects/night-shift/.panelindex/backups")
        );
    }

    #[test]
    fn test_effective_limit() {
        let config = IndexConfig::default();
        assert_eq!(config.effective_limit(0), 50);
        assert_eq!(config.effective_limit(7), 7);
        assert_eq!(config.effective_limit(10_000), 500);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{ "default_limit": 20, "snippet_open": "[" }"#).unwrap();

        let config = IndexConfig::from_json_file(&path).unwrap();
        assert_eq!(config.default_limit, 20);
        assert_eq!(config.snippet_open, "[");
        assert_eq!(config.file_name, "index.db");
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let config = IndexConfig {
            default_limit: 600,
            ..IndexConfig::default()
        };
        assert!(matches!(config.validate(), Err(IndexError::Config(_))));
    }
}
