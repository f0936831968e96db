//! Project index operations
//!
//! The functions here are the per-call entry points: each opens the index for
//! `root` with default settings, does its work and closes it again. Callers
//! that issue many calls can open an `IndexStore` once and use its methods.

pub mod builder;
pub mod catalog;
pub mod integrity;
pub mod projector;
pub mod search;

pub use builder::BuildStats;
pub use catalog::{Asset, Preview, ScriptSnapshot, Snapshot, content_hash};
pub use integrity::{IntegrityGuard, RecoveryReport};
pub use projector::{DocKind, DocLink, Document, project, speaker_links};
pub use search::{SearchHit, SearchQuery, match_expression};

use crate::context::Context;
use crate::error::Result;
use crate::model::ProjectSource;
use crate::storage::store::IndexStore;
use std::path::Path;

/// Open the index under `root`, running migrations
pub fn open<P: AsRef<Path>>(root: P) -> Result<IndexStore> {
    IndexStore::open(root)
}

/// Probe the index and rebuild it from `source` if it is corrupt; true if rebuilt
pub fn detect_and_rebuild(ctx: &Context, root: &Path, source: ProjectSource<'_>) -> Result<bool> {
    detect_and_rebuild_report(ctx, root, source).map(|report| report.rebuilt)
}

/// Like `detect_and_rebuild`, also reporting the backup path and the reason
pub fn detect_and_rebuild_report(
    ctx: &Context,
    root: &Path,
    source: ProjectSource<'_>,
) -> Result<RecoveryReport> {
    IntegrityGuard::default().detect_and_rebuild(ctx, root, source)
}

/// Populate the index from `source` only if it has no documents
pub fn build_if_empty(ctx: &Context, root: &Path, source: ProjectSource<'_>) -> Result<()> {
    IndexStore::open(root)?.build_if_empty(ctx, source)?;
    Ok(())
}

/// Replace every document with a fresh projection of `source`
pub fn update(ctx: &Context, root: &Path, source: ProjectSource<'_>) -> Result<()> {
    IndexStore::open(root)?.update(ctx, source)?;
    Ok(())
}

/// Recreate the document tables and full-text mirror from `source`
pub fn rebuild(ctx: &Context, root: &Path, source: ProjectSource<'_>) -> Result<()> {
    IndexStore::open(root)?.rebuild(ctx, source)?;
    Ok(())
}

/// Ranked full-text search
pub fn search(ctx: &Context, root: &Path, query: &SearchQuery) -> Result<Vec<SearchHit>> {
    IndexStore::open(root)?.search(ctx, query)
}
