//! Schema bootstrap and versioned migrations
//!
//! The `version` table holds a single row. A fresh file is seeded at the
//! target version in one transaction; an existing file is walked forward one
//! step at a time, each step in its own transaction. A file stamped with a
//! version newer than this binary knows is left untouched.

use crate::error::{IndexError, Result};
use crate::storage::schema::{self, BOOKKEEPING};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

/// Current schema version written by this build
pub const SCHEMA_VERSION: u32 = 3;

/// Step number reported for failures while bootstrapping bookkeeping tables
pub const BOOTSTRAP_STEP: u32 = 0;

/// One forward migration step
struct Migration {
    version: u32,
    description: &'static str,
    statements: &'static [&'static [&'static str]],
}

/// Ordered, append-only migration list
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "documents, full-text mirror, cross references, assets",
        statements: &[schema::DOCUMENTS, schema::REFERENCES],
    },
    Migration {
        version: 2,
        description: "preview, snapshot and script history caches",
        statements: &[schema::CACHES],
    },
    Migration {
        version: 3,
        description: "page index on documents, full-text resync",
        statements: &[&[schema::DOCUMENTS_PAGE_INDEX, schema::FTS_REBUILD]],
    },
];

/// Contents of the single `version` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion {
    pub schema: u32,
    pub app: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the migrator did on open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Fresh file, schema created at `version`
    Seeded { version: u32 },

    /// Stored version already equals the target
    UpToDate { version: u32 },

    /// Steps `from + 1 ..= to` were applied
    Migrated { from: u32, to: u32 },

    /// Stored version is newer than this binary; nothing was touched
    NewerThanBinary { stored: u32, target: u32 },
}

impl MigrationOutcome {
    /// Version the file is at after migrating
    pub fn version(&self) -> u32 {
        match *self {
            MigrationOutcome::Seeded { version } | MigrationOutcome::UpToDate { version } => version,
            MigrationOutcome::Migrated { to, .. } => to,
            MigrationOutcome::NewerThanBinary { stored, .. } => stored,
        }
    }
}

/// Applies migration steps up to a target version
#[derive(Debug, Clone, Copy)]
pub struct SchemaMigrator {
    target: u32,
}

impl Default for SchemaMigrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaMigrator {
    pub fn new() -> Self {
        Self {
            target: SCHEMA_VERSION,
        }
    }

    /// Stop at `target` instead of the latest version (clamped to the latest)
    pub fn with_target(target: u32) -> Self {
        Self {
            target: target.min(SCHEMA_VERSION),
        }
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Bring the schema on `conn` up to the target version
    pub fn migrate(&self, conn: &mut Connection) -> Result<MigrationOutcome> {
        let stored = {
            let tx = conn
                .transaction()
                .map_err(IndexError::schema(BOOTSTRAP_STEP))?;
            for stmt in BOOKKEEPING {
                tx.execute_batch(stmt)
                    .map_err(IndexError::schema(BOOTSTRAP_STEP))?;
            }

            match read_version(&tx).map_err(IndexError::schema(BOOTSTRAP_STEP))? {
                Some(version) => {
                    tx.commit().map_err(IndexError::schema(BOOTSTRAP_STEP))?;
                    version.schema
                }
                None => {
                    self.seed(&tx)?;
                    tx.commit().map_err(IndexError::schema(self.target))?;
                    log::info!("Index schema created at version {}", self.target);
                    return Ok(MigrationOutcome::Seeded {
                        version: self.target,
                    });
                }
            }
        };

        if stored > self.target {
            log::warn!(
                "Index schema version {} is newer than supported {}; skipping migrations",
                stored,
                self.target
            );
            return Ok(MigrationOutcome::NewerThanBinary {
                stored,
                target: self.target,
            });
        }

        if stored == self.target {
            return Ok(MigrationOutcome::UpToDate { version: stored });
        }

        for migration in MIGRATIONS
            .iter()
            .filter(|m| m.version > stored && m.version <= self.target)
        {
            log::info!(
                "Applying index migration {}: {}",
                migration.version,
                migration.description
            );
            apply(conn, migration)?;
        }

        Ok(MigrationOutcome::Migrated {
            from: stored,
            to: self.target,
        })
    }

    /// Create every object up to the target and stamp the version row
    fn seed(&self, conn: &Connection) -> Result<()> {
        for migration in MIGRATIONS.iter().filter(|m| m.version <= self.target) {
            run_statements(conn, migration)?;
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO version (id, schema, app, created_at, updated_at) VALUES (1, ?1, ?2, ?3, ?3)",
            params![self.target, env!("CARGO_PKG_VERSION"), now],
        )
        .map_err(IndexError::schema(self.target))?;
        Ok(())
    }
}

/// Run one step atomically; the version row moves only if every statement succeeded
fn apply(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let tx = conn
        .transaction()
        .map_err(IndexError::schema(migration.version))?;
    run_statements(&tx, migration)?;
    tx.execute(
        "UPDATE version SET schema = ?1, app = ?2, updated_at = ?3 WHERE id = 1",
        params![migration.version, env!("CARGO_PKG_VERSION"), Utc::now()],
    )
    .map_err(IndexError::schema(migration.version))?;
    tx.commit().map_err(IndexError::schema(migration.version))
}

fn run_statements(conn: &Connection, migration: &Migration) -> Result<()> {
    for group in migration.statements {
        for stmt in group.iter() {
            conn.execute_batch(stmt)
                .map_err(IndexError::schema(migration.version))?;
        }
    }
    Ok(())
}

/// Read the version row, if the file has one
pub fn read_version(conn: &Connection) -> rusqlite::Result<Option<SchemaVersion>> {
    conn.query_row(
        "SELECT schema, app, created_at, updated_at FROM version WHERE id = 1",
        [],
        |row| {
            Ok(SchemaVersion {
                schema: row.get(0)?,
                app: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Merge full-text segments after a schema change or rebuild; failures are swallowed
pub(crate) fn optimize(conn: &Connection) {
    if let Err(e) = conn.execute_batch(schema::FTS_OPTIMIZE) {
        log::warn!("Full-text optimize skipped: {}", e);
    }
}
