//! IndexStore: the on-disk index file and its single connection
//!
//! One store per project root. The connection sits behind a mutex, so at most
//! one statement runs at a time from this process; WAL lets other readers
//! proceed while a write is in flight.

use crate::config::IndexConfig;
use crate::context::Context;
use crate::error::{ConnectionCause, IndexError, Result};
use crate::storage::migrations::{self, MigrationOutcome, SchemaMigrator, SchemaVersion};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Open index handle for one project root
pub struct IndexStore {
    conn: Mutex<Connection>,
    root: PathBuf,
    path: PathBuf,
    config: IndexConfig,
    outcome: MigrationOutcome,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("path", &self.path)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Row counts and size of an open index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: u64,
    pub fts_rows: u64,
    pub cross_refs: u64,
    pub schema_version: u32,
    pub file_size_bytes: u64,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "documents: {}, fts rows: {}, cross refs: {}, schema: v{}, size: {}",
            self.documents,
            self.fts_rows,
            self.cross_refs,
            self.schema_version,
            crate::utils::format_file_size(self.file_size_bytes)
        )
    }
}

impl IndexStore {
    /// Open (or create) the index under `root` with default settings
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::open_with(root, IndexConfig::default())
    }

    /// Open (or create) the index under `root` with an explicit configuration
    pub fn open_with<P: AsRef<Path>>(root: P, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let root = root.as_ref().to_path_buf();
        let path = config.index_path(&root);

        std::fs::create_dir_all(config.index_dir(&root)).map_err(|e| IndexError::Connection {
            path: path.clone(),
            source: ConnectionCause::Io(e),
        })?;

        let mut conn = Connection::open(&path).map_err(|e| IndexError::Connection {
            path: path.clone(),
            source: ConnectionCause::Sqlite(e),
        })?;
        configure(&conn, &config, &path)?;

        let outcome = SchemaMigrator::new().migrate(&mut conn)?;
        if matches!(outcome, MigrationOutcome::Migrated { .. }) {
            migrations::optimize(&conn);
        }

        log::info!(
            "Opened project index at {} (schema v{})",
            path.display(),
            outcome.version()
        );

        Ok(Self {
            conn: Mutex::new(conn),
            root,
            path,
            config,
            outcome,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolved path of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// What the migrator did when this handle was opened
    pub fn migration_outcome(&self) -> MigrationOutcome {
        self.outcome
    }

    /// Current contents of the version row
    pub fn schema_version(&self) -> Result<Option<SchemaVersion>> {
        let conn = self.lock();
        migrations::read_version(&conn).map_err(IndexError::db("schema_version"))
    }

    /// Merge full-text segments. Best effort: ignores the caller's context, logs failures
    pub(crate) fn optimize_fts(&self) {
        let conn = self.lock();
        migrations::optimize(&conn);
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves nothing half-committed; keep using the connection.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` on the connection under `ctx`.
    ///
    /// A progress handler interrupts the running statement once `ctx` is done,
    /// and the busy wait never outlasts the deadline. Any failure observed after
    /// the context finished is reported as a timeout/cancellation.
    pub(crate) fn with_conn<T, F>(&self, ctx: &Context, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        ctx.check(op)?;
        let mut conn = self.lock();

        let busy = match ctx.deadline() {
            Some(deadline) => self
                .config
                .busy_timeout()
                .min(deadline.saturating_duration_since(std::time::Instant::now())),
            None => self.config.busy_timeout(),
        };
        conn.busy_timeout(busy).map_err(IndexError::db(op))?;

        let watcher = ctx.clone();
        conn.progress_handler(self.config.progress_ops, Some(move || watcher.is_done()));

        let outcome = f(&mut conn);

        conn.progress_handler(self.config.progress_ops, None::<fn() -> bool>);
        if !conn.is_autocommit() {
            // The rollback on drop was itself interrupted
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                log::warn!("Failed to roll back abandoned transaction in {}: {}", op, e);
            }
        }
        if let Err(e) = conn.busy_timeout(self.config.busy_timeout()) {
            log::warn!("Failed to restore busy timeout: {}", e);
        }

        outcome.map_err(|e| ctx.err(op).unwrap_or(e))
    }

    /// Run `f` inside a transaction; it commits only if `f` succeeds.
    ///
    /// Dropping the uncommitted transaction (error or cancellation) rolls it back.
    pub(crate) fn transaction<T, F>(&self, ctx: &Context, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.with_conn(ctx, op, |conn| {
            let tx = conn.transaction().map_err(IndexError::db(op))?;
            let value = f(&tx)?;
            tx.commit().map_err(IndexError::db(op))?;
            Ok(value)
        })
    }

    /// Number of document rows
    pub fn document_count(&self, ctx: &Context) -> Result<u64> {
        self.with_conn(ctx, "document_count", |conn| {
            count(conn, "SELECT COUNT(*) FROM documents").map_err(IndexError::db("document_count"))
        })
    }

    /// Row counts, schema version and file size
    pub fn stats(&self, ctx: &Context) -> Result<IndexStats> {
        let op = "stats";
        self.with_conn(ctx, op, |conn| {
            let documents = count(conn, "SELECT COUNT(*) FROM documents").map_err(IndexError::db(op))?;
            // docsize holds one row per indexed document, independent of the content table
            let fts_rows =
                count(conn, "SELECT COUNT(*) FROM documents_fts_docsize").map_err(IndexError::db(op))?;
            let cross_refs = count(conn, "SELECT COUNT(*) FROM cross_refs").map_err(IndexError::db(op))?;
            let schema_version = migrations::read_version(conn)
                .map_err(IndexError::db(op))?
                .map(|v| v.schema)
                .unwrap_or(0);
            let file_size_bytes = count(
                conn,
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
            )
            .map_err(IndexError::db(op))?;

            Ok(IndexStats {
                documents,
                fts_rows,
                cross_refs,
                schema_version,
                file_size_bytes,
            })
        })
    }

    /// Ask SQLite to verify the full-text index against the documents table
    pub fn verify_fts(&self, ctx: &Context) -> Result<()> {
        self.with_conn(ctx, "verify_fts", |conn| {
            conn.execute_batch(
                "INSERT INTO documents_fts(documents_fts, rank) VALUES ('integrity-check', 1);",
            )
            .map_err(IndexError::db("verify_fts"))
        })
    }
}

/// Single-writer connection setup: busy wait, WAL (required), foreign keys (best effort)
fn configure(conn: &Connection, config: &IndexConfig, path: &Path) -> Result<()> {
    let connection_error = |e: rusqlite::Error| IndexError::Connection {
        path: path.to_path_buf(),
        source: ConnectionCause::Sqlite(e),
    };

    conn.busy_timeout(config.busy_timeout())
        .map_err(connection_error)?;

    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))
        .map_err(connection_error)?;
    if !mode.eq_ignore_ascii_case("wal") {
        return Err(IndexError::Connection {
            path: path.to_path_buf(),
            source: ConnectionCause::Io(std::io::Error::other(format!(
                "write-ahead logging unavailable (journal_mode={})",
                mode
            ))),
        });
    }

    if let Err(e) = conn.pragma_update(None, "foreign_keys", "ON") {
        log::warn!(
            "Foreign key enforcement not enabled for {}: {}",
            path.display(),
            e
        );
    }

    Ok(())
}

pub(crate) fn count(conn: &Connection, sql: &str) -> rusqlite::Result<u64> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::SCHEMA_VERSION;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_index_file() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();

        assert!(store.path().exists());
        assert!(store.path().ends_with(".panelindex/index.db"));
        assert_eq!(
            store.migration_outcome(),
            MigrationOutcome::Seeded { version: SCHEMA_VERSION }
        );
    }

    #[test]
    fn test_wal_and_foreign_keys_enabled() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let conn = store.lock();

        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_reopen_is_up_to_date() {
        let dir = tempdir().unwrap();
        drop(IndexStore::open(dir.path()).unwrap());
        let store = IndexStore::open(dir.path()).unwrap();

        assert_eq!(
            store.migration_outcome(),
            MigrationOutcome::UpToDate { version: SCHEMA_VERSION }
        );
        let version = store.schema_version().unwrap().unwrap();
        assert_eq!(version.schema, SCHEMA_VERSION);
    }

    #[test]
    fn test_empty_stats() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let stats = store.stats(&Context::background()).unwrap();

        assert_eq!(stats.documents, 0);
        assert_eq!(stats.fts_rows, 0);
        assert_eq!(stats.schema_version, SCHEMA_VERSION);
        assert!(stats.file_size_bytes > 0);
    }

    #[test]
    fn test_canceled_context_fails_fast() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let err = store.document_count(&ctx).unwrap_err();
        assert!(matches!(err, IndexError::Canceled { op: "document_count" }));
    }

    #[test]
    fn test_deadline_interrupts_long_statement() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let ctx = Context::with_timeout(Duration::from_millis(50));

        let err = store
            .with_conn(&ctx, "spin", |conn| {
                conn.query_row(
                    "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT COUNT(*) FROM c",
                    [],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(IndexError::db("spin"))
            })
            .unwrap_err();
        assert!(matches!(err, IndexError::QueryTimeout { op: "spin" }));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let dir = tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let ctx = Context::background();

        let result: Result<()> = store.transaction(&ctx, "insert", |tx| {
            tx.execute(
                "INSERT INTO assets (hash, path, type) VALUES ('h', 'a.png', 'image')",
                [],
            )
            .map_err(IndexError::db("insert"))?;
            Err(IndexError::Config("abort".to_string()))
        });
        assert!(result.is_err());

        let conn = store.lock();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM assets").unwrap(), 0);
    }

    #[test]
    fn test_invalid_config_rejected_before_touching_disk() {
        let dir = tempdir().unwrap();
        let config = IndexConfig {
            max_limit: 0,
            ..IndexConfig::default()
        };
        assert!(matches!(
            IndexStore::open_with(dir.path(), config),
            Err(IndexError::Config(_))
        ));
        assert!(!dir.path().join(".panelindex").exists());
    }
}
