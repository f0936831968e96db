//! # panel-index
//!
//! An embedded, self-healing full-text index for comic projects. The project
//! model stays the source of truth; the index is a derived SQLite mirror of it
//! (metadata, bible, panels, balloons and script text) that can be searched
//! instantly and rebuilt wholesale at any time.
//!
//! Documents are addressed by structural paths such as
//! `issue:1/page:3/panel:p2/balloon:b1`. The issue segment is the issue's
//! 1-based position in the model, so a single-issue project always uses
//! `issue:1`; adding or reordering issues renumbers the paths of later ones.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use panel_index::{Context, IndexStore, Project, ProjectSource, SearchQuery};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let project = Project::from_json_file("night-shift.json")?;
//!     let store = IndexStore::open("night-shift")?;
//!     let ctx = Context::background();
//!
//!     store.build_if_empty(&ctx, ProjectSource::new(&project))?;
//!
//!     for hit in store.search(&ctx, &SearchQuery::new("hello"))? {
//!         println!("{} [{}] {}", hit.path, hit.doc_type, hit.snippet);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod model;
pub mod storage;
pub mod utils;

// Re-export main API types
pub use config::IndexConfig;
pub use context::Context;
pub use error::{ConnectionCause, IndexError, Result};
pub use index::{
    BuildStats, DocKind, Document, IntegrityGuard, RecoveryReport, SearchHit, SearchQuery,
    build_if_empty, detect_and_rebuild, detect_and_rebuild_report, open, rebuild, search, update,
};
pub use model::{Project, ProjectSource, ScriptSource};
pub use storage::{IndexStats, IndexStore, MigrationOutcome, SCHEMA_VERSION, SchemaMigrator};
