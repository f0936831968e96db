//! Corruption detection and self-healing rebuild
//!
//! A file that will not open, fails `PRAGMA quick_check`, or cannot serve a
//! plain read of `documents` is treated as corrupt: it is copied to
//! `backups/<file>.<YYYYMMDD-HHMMSS>.bak` (best effort), deleted, and rebuilt
//! from the model. Recovery is attempted once per call; if the rebuild fails
//! the error is surfaced as `RebuildFailed`.

use crate::config::IndexConfig;
use crate::context::Context;
use crate::error::{IndexError, Result};
use crate::model::ProjectSource;
use crate::storage::store::IndexStore;
use crate::utils;
use rusqlite::OptionalExtension;
use std::path::{Path, PathBuf};

/// Outcome of a detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// True when the index was deleted and rebuilt
    pub rebuilt: bool,

    /// Where the corrupt file was preserved, if the copy succeeded
    pub backup: Option<PathBuf>,

    /// Why the file was considered corrupt
    pub reason: Option<String>,
}

/// Wraps the open path with health probes and recovery
#[derive(Debug, Clone, Default)]
pub struct IntegrityGuard {
    config: IndexConfig,
}

impl IntegrityGuard {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    /// Open the index under `root`, probing it and rebuilding it if it is corrupt
    pub fn detect_and_rebuild(
        &self,
        ctx: &Context,
        root: &Path,
        source: ProjectSource<'_>,
    ) -> Result<RecoveryReport> {
        self.config.validate()?;
        ctx.check("detect_and_rebuild")?;

        let reason = match IndexStore::open_with(root, self.config.clone()) {
            Err(e) => e.to_string(),
            Ok(store) => match probe(&store, ctx) {
                Ok(()) => return Ok(RecoveryReport::default()),
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => e.to_string(),
            },
        };

        self.recover(ctx, root, source, reason)
    }

    /// Back up, delete and rebuild the index file
    fn recover(
        &self,
        ctx: &Context,
        root: &Path,
        source: ProjectSource<'_>,
        reason: String,
    ) -> Result<RecoveryReport> {
        let path = self.config.index_path(root);
        log::warn!(
            "Index at {} is corrupt ({}); rebuilding from the project model",
            path.display(),
            reason
        );

        let backup = self.backup(&path, root);

        let rebuilt = utils::remove_index_files(&path).and_then(|()| {
            let store = IndexStore::open_with(root, self.config.clone())?;
            store.rebuild(ctx, source)
        });

        match rebuilt {
            Ok(stats) => {
                log::info!("Recovered index at {}: {}", path.display(), stats);
                Ok(RecoveryReport {
                    rebuilt: true,
                    backup,
                    reason: Some(reason),
                })
            }
            Err(e) if e.is_cancellation() => Err(e),
            Err(e) => Err(IndexError::RebuildFailed {
                path,
                source: Box::new(e),
            }),
        }
    }

    /// Copy the corrupt file aside; failures are logged and ignored
    fn backup(&self, path: &Path, root: &Path) -> Option<PathBuf> {
        if !path.exists() {
            return None;
        }

        let dir = self.config.backup_path(root);
        let target = utils::backup_file_path(path, &dir, chrono::Local::now());
        let copied = utils::ensure_directory(&dir)
            .and_then(|()| std::fs::copy(path, &target).map_err(IndexError::from));

        match copied {
            Ok(_) => {
                log::info!("Backed up corrupt index to {}", target.display());
                Some(target)
            }
            Err(e) => {
                log::warn!("Could not back up {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Quick integrity check plus a direct read of the core table
pub fn probe(store: &IndexStore, ctx: &Context) -> Result<()> {
    let op = "probe";
    let corrupt = |reason: String| IndexError::CorruptionDetected {
        path: store.path().to_path_buf(),
        reason,
    };

    let verdict = store.with_conn(ctx, op, |conn| {
        conn.query_row("PRAGMA quick_check", [], |row| row.get::<_, String>(0))
            .map_err(IndexError::db(op))
    });
    match verdict {
        Ok(v) if v.eq_ignore_ascii_case("ok") => {}
        Ok(v) => return Err(corrupt(format!("quick_check: {}", v))),
        Err(e) if e.is_cancellation() => return Err(e),
        Err(e) => return Err(corrupt(format!("quick_check failed: {}", e))),
    }

    let read = store.with_conn(ctx, op, |conn| {
        conn.query_row(
            "SELECT doc_id, type, path, text FROM documents ORDER BY doc_id LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()
        .map_err(IndexError::db(op))
    });
    match read {
        Ok(_) => Ok(()),
        Err(e) if e.is_cancellation() => Err(e),
        Err(e) => Err(corrupt(format!("documents unreadable: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, ProjectMeta};
    use tempfile::tempdir;

    fn named(name: &str) -> Project {
        Project {
            meta: ProjectMeta {
                name: name.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_index_is_left_alone() {
        let dir = tempdir().unwrap();
        let ctx = Context::background();
        let project = named("Night Shift");
        IndexStore::open(dir.path())
            .unwrap()
            .rebuild(&ctx, ProjectSource::new(&project))
            .unwrap();

        let report = IntegrityGuard::default()
            .detect_and_rebuild(&ctx, dir.path(), ProjectSource::new(&project))
            .unwrap();
        assert_eq!(report, RecoveryReport::default());
    }

    #[test]
    fn test_missing_documents_table_triggers_rebuild() {
        let dir = tempdir().unwrap();
        let ctx = Context::background();
        let project = named("Night Shift");
        let store = IndexStore::open(dir.path()).unwrap();
        store.rebuild(&ctx, ProjectSource::new(&project)).unwrap();
        store
            .with_conn(&ctx, "sabotage", |conn| {
                conn.execute_batch(
                    "DROP TRIGGER documents_ai; DROP TRIGGER documents_ad; DROP TRIGGER documents_au;
                     DROP TABLE documents_fts; DROP TABLE documents;",
                )
                .map_err(IndexError::db("sabotage"))
            })
            .unwrap();
        drop(store);

        let report = IntegrityGuard::default()
            .detect_and_rebuild(&ctx, dir.path(), ProjectSource::new(&project))
            .unwrap();
        assert!(report.rebuilt);
        assert!(report.reason.unwrap().contains("documents unreadable"));

        let store = IndexStore::open(dir.path()).unwrap();
        assert_eq!(store.document_count(&ctx).unwrap(), 1);
    }

    #[test]
    fn test_garbage_file_is_backed_up_and_rebuilt() {
        let dir = tempdir().unwrap();
        let ctx = Context::background();
        let config = IndexConfig::default();
        let path = config.index_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0xA5u8; 8192]).unwrap();

        let project = named("Night Shift");
        let report = IntegrityGuard::new(config)
            .detect_and_rebuild(&ctx, dir.path(), ProjectSource::new(&project))
            .unwrap();

        assert!(report.rebuilt);
        let backup = report.backup.unwrap();
        assert!(backup.exists());
        assert_eq!(std::fs::read(&backup).unwrap(), vec![0xA5u8; 8192]);
        let name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("index.db.") && name.ends_with(".bak"));
    }

    #[test]
    fn test_canceled_detection_does_not_rebuild() {
        let dir = tempdir().unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let err = IntegrityGuard::default()
            .detect_and_rebuild(&ctx, dir.path(), ProjectSource::new(&Project::default()))
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(!dir.path().join(".panelindex").exists());
    }
}
