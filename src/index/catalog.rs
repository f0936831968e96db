//! Cross references, the asset catalog and cached artifacts
//!
//! Cross references are rewritten with the documents. Assets, previews and
//! snapshots have their own lifecycle; previews and snapshots are caches and
//! `clear_caches` may drop them at any time.

use crate::context::Context;
use crate::error::{IndexError, Result};
use crate::storage::store::IndexStore;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A cataloged asset file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub hash: String,
    pub path: String,
    pub asset_type: String,
}

/// Cached thumbnail for a page or one of its panels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub page_id: i64,
    pub panel_id: Option<String>,
    pub thumbnail: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

/// A recorded page change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: i64,
    pub page_id: i64,
    pub ts: DateTime<Utc>,
    pub delta: String,
}

/// A saved copy of the script text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSnapshot {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub text: String,
}

/// Hex SHA-256 of `bytes`, the key of the asset catalog
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl IndexStore {
    /// Paths of documents that reference any document at `path`
    pub fn where_used(&self, ctx: &Context, path: &str) -> Result<Vec<String>> {
        let op = "where_used";
        self.with_conn(ctx, op, |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT src.path
                     FROM cross_refs c
                     JOIN documents dst ON dst.doc_id = c.to_id
                     JOIN documents src ON src.doc_id = c.from_id
                     WHERE dst.path = ?1
                     ORDER BY src.path",
                )
                .map_err(IndexError::db(op))?;
            let rows = stmt
                .query_map([path], |row| row.get::<_, String>(0))
                .map_err(IndexError::db(op))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(IndexError::db(op))
        })
    }

    /// Add or repoint an asset entry
    pub fn register_asset(&self, ctx: &Context, asset: &Asset) -> Result<()> {
        let op = "register_asset";
        self.with_conn(ctx, op, |conn| {
            conn.execute(
                "INSERT INTO assets (hash, path, type) VALUES (?1, ?2, ?3)
                 ON CONFLICT(hash) DO UPDATE SET path = excluded.path, type = excluded.type",
                params![asset.hash, asset.path, asset.asset_type],
            )
            .map_err(IndexError::db(op))?;
            Ok(())
        })
    }

    /// Hash a file on disk and catalog it under that hash
    pub fn register_asset_file(
        &self,
        ctx: &Context,
        file: &Path,
        asset_type: &str,
    ) -> Result<Asset> {
        let bytes = std::fs::read(file)?;
        let asset = Asset {
            hash: content_hash(&bytes),
            path: file.to_string_lossy().to_string(),
            asset_type: asset_type.to_string(),
        };
        self.register_asset(ctx, &asset)?;
        Ok(asset)
    }

    pub fn asset(&self, ctx: &Context, hash: &str) -> Result<Option<Asset>> {
        let op = "asset";
        self.with_conn(ctx, op, |conn| {
            conn.query_row(
                "SELECT hash, path, type FROM assets WHERE hash = ?1",
                [hash],
                |row| {
                    Ok(Asset {
                        hash: row.get(0)?,
                        path: row.get(1)?,
                        asset_type: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(IndexError::db(op))
        })
    }

    /// Store the thumbnail for a page (`panel_id = None`) or panel, replacing any previous one
    pub fn put_preview(
        &self,
        ctx: &Context,
        page_id: i64,
        panel_id: Option<&str>,
        thumbnail: &[u8],
    ) -> Result<()> {
        let op = "put_preview";
        self.with_conn(ctx, op, |conn| {
            conn.execute(
                "INSERT INTO previews (page_id, panel_id, thumbnail, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(page_id, panel_id) DO UPDATE
                 SET thumbnail = excluded.thumbnail, updated_at = excluded.updated_at",
                params![page_id, panel_id.unwrap_or(""), thumbnail, Utc::now()],
            )
            .map_err(IndexError::db(op))?;
            Ok(())
        })
    }

    pub fn preview(
        &self,
        ctx: &Context,
        page_id: i64,
        panel_id: Option<&str>,
    ) -> Result<Option<Preview>> {
        let op = "preview";
        self.with_conn(ctx, op, |conn| {
            conn.query_row(
                "SELECT page_id, panel_id, thumbnail, updated_at FROM previews
                 WHERE page_id = ?1 AND panel_id = ?2",
                params![page_id, panel_id.unwrap_or("")],
                |row| {
                    let panel: String = row.get(1)?;
                    Ok(Preview {
                        page_id: row.get(0)?,
                        panel_id: (!panel.is_empty()).then_some(panel),
                        thumbnail: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(IndexError::db(op))
        })
    }

    /// Record a change delta for a page
    pub fn record_snapshot(&self, ctx: &Context, page_id: i64, delta: &str) -> Result<i64> {
        let op = "record_snapshot";
        self.with_conn(ctx, op, |conn| {
            conn.execute(
                "INSERT INTO snapshots (page_id, ts, delta) VALUES (?1, ?2, ?3)",
                params![page_id, Utc::now(), delta],
            )
            .map_err(IndexError::db(op))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Snapshots of a page, newest first
    pub fn page_snapshots(&self, ctx: &Context, page_id: i64) -> Result<Vec<Snapshot>> {
        let op = "page_snapshots";
        self.with_conn(ctx, op, |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, page_id, ts, delta FROM snapshots
                     WHERE page_id = ?1 ORDER BY ts DESC, id DESC",
                )
                .map_err(IndexError::db(op))?;
            let rows = stmt
                .query_map([page_id], |row| {
                    Ok(Snapshot {
                        id: row.get(0)?,
                        page_id: row.get(1)?,
                        ts: row.get(2)?,
                        delta: row.get(3)?,
                    })
                })
                .map_err(IndexError::db(op))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(IndexError::db(op))
        })
    }

    /// Save a copy of the script text
    pub fn record_script_snapshot(&self, ctx: &Context, text: &str) -> Result<i64> {
        let op = "record_script_snapshot";
        self.with_conn(ctx, op, |conn| {
            conn.execute(
                "INSERT INTO script_snapshots (ts, text) VALUES (?1, ?2)",
                params![Utc::now(), text],
            )
            .map_err(IndexError::db(op))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Most recent script snapshots, newest first
    pub fn script_history(&self, ctx: &Context, limit: usize) -> Result<Vec<ScriptSnapshot>> {
        let op = "script_history";
        let limit = self.config().effective_limit(limit) as i64;
        self.with_conn(ctx, op, |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, ts, text FROM script_snapshots
                     ORDER BY ts DESC, id DESC LIMIT ?1",
                )
                .map_err(IndexError::db(op))?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(ScriptSnapshot {
                        id: row.get(0)?,
                        ts: row.get(1)?,
                        text: row.get(2)?,
                    })
                })
                .map_err(IndexError::db(op))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(IndexError::db(op))
        })
    }

    /// Drop every cached preview and snapshot; documents and assets are untouched
    pub fn clear_caches(&self, ctx: &Context) -> Result<()> {
        let op = "clear_caches";
        self.transaction(ctx, op, |tx| {
            tx.execute_batch(
                "DELETE FROM previews; DELETE FROM snapshots; DELETE FROM script_snapshots;",
            )
            .map_err(IndexError::db(op))
        })?;
        log::info!("Cleared cached previews and snapshots in {}", self.path().display());
        Ok(())
    }
}
