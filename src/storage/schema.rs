//! Database schema definitions
//!
//! Every statement is idempotent (`IF NOT EXISTS`) so the same lists can be
//! replayed by the first-open bootstrap, the migration steps and `rebuild`.

/// Bookkeeping tables, created before anything else on every open
pub const BOOKKEEPING: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema INTEGER NOT NULL,
    app TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
];

/// Documents, their full-text mirror and the triggers that keep the two in step.
///
/// The FTS table is external-content: it stores only the tokenized index and
/// reads text back from `documents` for snippets.
pub const DOCUMENTS: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS documents (
    doc_id INTEGER PRIMARY KEY,
    type TEXT NOT NULL,
    path TEXT NOT NULL,
    page_id INTEGER,
    character_id INTEGER,
    text TEXT NOT NULL
);
"#,
    "CREATE INDEX IF NOT EXISTS idx_documents_path ON documents(path);",
    r#"
CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    text,
    content = 'documents',
    content_rowid = 'doc_id',
    tokenize = 'unicode61 remove_diacritics 2'
);
"#,
    r#"
CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
    INSERT INTO documents_fts(rowid, text) VALUES (new.doc_id, new.text);
END;
"#,
    r#"
CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
    INSERT INTO documents_fts(documents_fts, rowid, text) VALUES ('delete', old.doc_id, old.text);
END;
"#,
    r#"
CREATE TRIGGER IF NOT EXISTS documents_au AFTER UPDATE ON documents BEGIN
    INSERT INTO documents_fts(documents_fts, rowid, text) VALUES ('delete', old.doc_id, old.text);
    INSERT INTO documents_fts(rowid, text) VALUES (new.doc_id, new.text);
END;
"#,
];

/// Page lookups; added after the first release
pub const DOCUMENTS_PAGE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_page ON documents(page_id);";

/// Tear down the documents family; `DOCUMENTS` recreates it
pub const DROP_DOCUMENTS: &[&str] = &[
    "DROP TRIGGER IF EXISTS documents_ai;",
    "DROP TRIGGER IF EXISTS documents_ad;",
    "DROP TRIGGER IF EXISTS documents_au;",
    "DROP TABLE IF EXISTS documents_fts;",
    "DROP TABLE IF EXISTS documents;",
];

/// Cross references and the asset catalog
pub const REFERENCES: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS cross_refs (
    from_id INTEGER NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    to_id INTEGER NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    PRIMARY KEY (from_id, to_id)
);
"#,
    "CREATE INDEX IF NOT EXISTS idx_cross_refs_to ON cross_refs(to_id);",
    r#"
CREATE TABLE IF NOT EXISTS assets (
    hash TEXT PRIMARY KEY,
    path TEXT NOT NULL,
    type TEXT NOT NULL
);
"#,
];

/// Cached artifacts: thumbnails, page deltas, script history.
///
/// `panel_id` is '' for page-level previews so the unique key holds.
pub const CACHES: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS previews (
    id INTEGER PRIMARY KEY,
    page_id INTEGER NOT NULL,
    panel_id TEXT NOT NULL DEFAULT '',
    thumbnail BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (page_id, panel_id)
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY,
    page_id INTEGER NOT NULL,
    ts TEXT NOT NULL,
    delta TEXT NOT NULL
);
"#,
    "CREATE INDEX IF NOT EXISTS idx_snapshots_page ON snapshots(page_id, ts);",
    r#"
CREATE TABLE IF NOT EXISTS script_snapshots (
    id INTEGER PRIMARY KEY,
    ts TEXT NOT NULL,
    text TEXT NOT NULL
);
"#,
];

/// Re-sync the full-text mirror from `documents`
pub const FTS_REBUILD: &str = "INSERT INTO documents_fts(documents_fts) VALUES ('rebuild');";

/// Merge FTS segments; purely an optimization
pub const FTS_OPTIMIZE: &str = "INSERT INTO documents_fts(documents_fts) VALUES ('optimize');";
