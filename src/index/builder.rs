//! Writing the projection into the index
//!
//! Documents are never patched in place: every write path replaces the whole
//! row set inside one transaction. The full-text mirror follows through the
//! triggers on `documents`, so there is no second write path to keep in step.

use crate::context::Context;
use crate::error::{IndexError, Result};
use crate::index::projector::{self, Document, DocLink};
use crate::model::ProjectSource;
use crate::storage::schema;
use crate::storage::store::{IndexStore, count};
use rusqlite::{Transaction, params};
use std::time::Instant;

/// What a build wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStats {
    pub documents: usize,
    pub cross_refs: usize,
    pub elapsed_ms: u128,
}

impl std::fmt::Display for BuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} documents, {} cross refs in {} ms",
            self.documents, self.cross_refs, self.elapsed_ms
        )
    }
}

impl IndexStore {
    /// Drop and recreate the documents table, its full-text mirror and
    /// triggers, then load a fresh projection, all in one transaction
    pub fn rebuild(&self, ctx: &Context, source: ProjectSource<'_>) -> Result<BuildStats> {
        let op = "rebuild";
        let started = Instant::now();
        let docs = projector::project(source);
        let links = projector::speaker_links(&docs);

        let cross_refs = self.transaction(ctx, op, |tx| {
            tx.execute_batch("DELETE FROM cross_refs;")
                .map_err(IndexError::db(op))?;
            for stmt in schema::DROP_DOCUMENTS
                .iter()
                .chain(schema::DOCUMENTS)
                .chain(std::iter::once(&schema::DOCUMENTS_PAGE_INDEX))
            {
                tx.execute_batch(stmt).map_err(IndexError::db(op))?;
            }
            write_documents(tx, ctx, op, &docs, &links)
        })?;

        // Rows are committed; nothing after this point may fail the rebuild
        self.optimize_fts();

        let stats = BuildStats {
            documents: docs.len(),
            cross_refs,
            elapsed_ms: started.elapsed().as_millis(),
        };
        log::info!("Rebuilt index {}: {}", self.path().display(), stats);
        Ok(stats)
    }

    /// Reproject and replace every document row
    pub fn update(&self, ctx: &Context, source: ProjectSource<'_>) -> Result<BuildStats> {
        let op = "update";
        let started = Instant::now();
        let docs = projector::project(source);
        let links = projector::speaker_links(&docs);

        let cross_refs = self.transaction(ctx, op, |tx| {
            // cross_refs cascades only when foreign keys are enforced
            tx.execute_batch("DELETE FROM cross_refs; DELETE FROM documents;")
                .map_err(IndexError::db(op))?;
            write_documents(tx, ctx, op, &docs, &links)
        })?;

        let stats = BuildStats {
            documents: docs.len(),
            cross_refs,
            elapsed_ms: started.elapsed().as_millis(),
        };
        log::debug!("Updated index {}: {}", self.path().display(), stats);
        Ok(stats)
    }

    /// Populate the index only if it has no documents yet.
    ///
    /// Returns `None` when rows already existed and nothing was written.
    pub fn build_if_empty(
        &self,
        ctx: &Context,
        source: ProjectSource<'_>,
    ) -> Result<Option<BuildStats>> {
        let op = "build_if_empty";
        let started = Instant::now();

        let written = self.transaction(ctx, op, |tx| {
            let existing = count(tx, "SELECT COUNT(*) FROM documents").map_err(IndexError::db(op))?;
            if existing > 0 {
                return Ok(None);
            }
            let docs = projector::project(source);
            let links = projector::speaker_links(&docs);
            let cross_refs = write_documents(tx, ctx, op, &docs, &links)?;
            Ok(Some((docs.len(), cross_refs)))
        })?;

        Ok(written.map(|(documents, cross_refs)| {
            let stats = BuildStats {
                documents,
                cross_refs,
                elapsed_ms: started.elapsed().as_millis(),
            };
            log::info!("Built empty index {}: {}", self.path().display(), stats);
            stats
        }))
    }
}

/// Insert documents with ids 1..=n in projection order, then their links
fn write_documents(
    tx: &Transaction<'_>,
    ctx: &Context,
    op: &'static str,
    docs: &[Document],
    links: &[DocLink],
) -> Result<usize> {
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO documents (doc_id, type, path, page_id, character_id, text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(IndexError::db(op))?;

        for (idx, doc) in docs.iter().enumerate() {
            ctx.check(op)?;
            stmt.execute(params![
                doc_id(idx),
                doc.kind.as_str(),
                doc.path,
                doc.page_id,
                doc.character_id,
                doc.text,
            ])
            .map_err(IndexError::db(op))?;
        }
    }

    let mut stmt = tx
        .prepare("INSERT OR IGNORE INTO cross_refs (from_id, to_id) VALUES (?1, ?2)")
        .map_err(IndexError::db(op))?;
    let mut written = 0;
    for link in links {
        written += stmt
            .execute(params![doc_id(link.from), doc_id(link.to)])
            .map_err(IndexError::db(op))?;
    }
    Ok(written)
}

fn doc_id(position: usize) -> i64 {
    position as i64 + 1
}
