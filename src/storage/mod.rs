//! Storage functionality for panel-index
//!
//! The index file, its connection and its schema.

pub mod migrations;
pub mod schema;
pub mod store;

// Re-export main types
pub use migrations::{MigrationOutcome, SCHEMA_VERSION, SchemaMigrator, SchemaVersion};
pub use store::{IndexStats, IndexStore};
