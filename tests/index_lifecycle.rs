//! Build, update and migration behavior of an on-disk index

mod common;

use panel_index::{Context, IndexStore, ProjectSource, SCHEMA_VERSION, ScriptSource, SearchQuery};
use rusqlite::Connection;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn assert_mirror_in_step(store: &IndexStore) -> Result<(), Box<dyn std::error::Error>> {
    let stats = store.stats(&Context::background())?;
    assert_eq!(stats.documents, stats.fts_rows, "fts mirror drifted: {}", stats);
    store.verify_fts(&Context::background())?;
    Ok(())
}

#[test]
fn test_fresh_index_is_current_and_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let store = IndexStore::open(dir.path())?;

    assert_eq!(store.migration_outcome().version(), SCHEMA_VERSION);
    let stats = store.stats(&Context::background())?;
    assert_eq!(stats.documents, 0);
    assert_eq!(stats.schema_version, SCHEMA_VERSION);
    assert!(store.path().starts_with(dir.path().join(".panelindex")));
    Ok(())
}

#[test]
fn test_mirror_tracks_rebuild_and_update() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let ctx = Context::background();
    let store = IndexStore::open(dir.path())?;

    let small = common::night_shift();
    let large = common::lantern_pages(4);
    let script = ScriptSource::new("issue1.txt", "PAGE ONE\nALICE: Hello, world!");

    store.rebuild(&ctx, ProjectSource::new(&small))?;
    assert_mirror_in_step(&store)?;

    store.update(&ctx, ProjectSource::new(&large).with_script(&script))?;
    assert_mirror_in_step(&store)?;

    store.update(&ctx, ProjectSource::new(&small))?;
    assert_mirror_in_step(&store)?;

    store.rebuild(&ctx, ProjectSource::new(&large))?;
    assert_mirror_in_step(&store)?;
    Ok(())
}

#[test]
fn test_update_forgets_removed_text() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let ctx = Context::background();
    let store = IndexStore::open(dir.path())?;

    let mut model = common::night_shift();
    store.rebuild(&ctx, ProjectSource::new(&model))?;
    assert_eq!(store.search(&ctx, &SearchQuery::new("Hello"))?.len(), 1);

    model.issues[0].pages[0].panels[0].balloons.clear();
    store.update(&ctx, ProjectSource::new(&model))?;

    assert!(store.search(&ctx, &SearchQuery::new("Hello"))?.is_empty());
    assert!(store.where_used(&ctx, "bible:character:ALICE")?.is_empty());
    Ok(())
}

#[test]
fn test_build_if_empty_only_builds_once() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let ctx = Context::background();
    let store = IndexStore::open(dir.path())?;

    let first = common::night_shift();
    let built = store.build_if_empty(&ctx, ProjectSource::new(&first))?;
    assert_eq!(built.map(|s| s.documents), Some(4));

    let other = common::lantern_pages(2);
    assert!(store.build_if_empty(&ctx, ProjectSource::new(&other))?.is_none());
    assert!(store.search(&ctx, &SearchQuery::new("lantern"))?.is_empty());
    assert_eq!(store.document_count(&ctx)?, 4);
    Ok(())
}

#[test]
fn test_free_functions_share_the_same_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let ctx = Context::background();
    let model = common::night_shift();

    panel_index::build_if_empty(&ctx, dir.path(), ProjectSource::new(&model))?;
    let hits = panel_index::search(&ctx, dir.path(), &SearchQuery::new("close"))?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "issue:1/page:1/panel:p1");
    assert_eq!(hits[0].doc_type, "panel");
    assert_eq!(hits[0].page_id, Some(1));
    Ok(())
}

#[test]
fn test_reopen_is_monotonic() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let ctx = Context::background();
    let model = common::night_shift();

    let path = {
        let store = IndexStore::open(dir.path())?;
        store.rebuild(&ctx, ProjectSource::new(&model))?;
        store.path().to_path_buf()
    };

    for _ in 0..3 {
        let store = IndexStore::open(dir.path())?;
        assert_eq!(store.migration_outcome().version(), SCHEMA_VERSION);
        assert_eq!(store.document_count(&ctx)?, 4);
    }

    let conn = Connection::open(&path)?;
    let (objects, distinct): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT name) FROM sqlite_master",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    assert_eq!(objects, distinct);

    let versions: i64 = conn.query_row("SELECT COUNT(*) FROM version", [], |row| row.get(0))?;
    assert_eq!(versions, 1);
    Ok(())
}

#[test]
fn test_concurrent_readers_see_whole_builds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let store = std::sync::Arc::new(IndexStore::open(dir.path())?);
    let small = common::night_shift();
    let large = common::lantern_pages(6);
    store.rebuild(&Context::background(), ProjectSource::new(&small))?;

    let reader = {
        let store = store.clone();
        std::thread::spawn(move || -> panel_index::Result<Vec<u64>> {
            let ctx = Context::background();
            let mut seen = Vec::new();
            for _ in 0..20 {
                seen.push(store.document_count(&ctx)?);
            }
            Ok(seen)
        })
    };

    for _ in 0..5 {
        store.update(&Context::background(), ProjectSource::new(&large))?;
        store.update(&Context::background(), ProjectSource::new(&small))?;
    }

    let large_count = panel_index::index::project(ProjectSource::new(&large)).len() as u64;
    let seen = reader.join().expect("reader thread")?;
    assert!(seen.iter().all(|&n| n == 4 || n == large_count));
    Ok(())
}

#[test]
fn test_deadlines_never_split_a_write() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let store = IndexStore::open(dir.path())?;
    let background = Context::background();
    let small = common::night_shift();
    let large = common::echo_chamber(3000);
    let large_count = panel_index::index::project(ProjectSource::new(&large)).len() as u64;

    let started = Instant::now();
    store.rebuild(&background, ProjectSource::new(&large))?;
    let full = started.elapsed().max(Duration::from_millis(1));

    // Deadlines from "already expired" to twice a full rebuild, for both write paths
    let mut interrupted = 0;
    for step in 0..=30u32 {
        for rebuild in [true, false] {
            store.rebuild(&background, ProjectSource::new(&small))?;

            let ctx = Context::with_timeout(full * step / 15);
            let outcome = if rebuild {
                store.rebuild(&ctx, ProjectSource::new(&large))
            } else {
                store.update(&ctx, ProjectSource::new(&large))
            };

            let documents = store.document_count(&background)?;
            match outcome {
                Ok(stats) => {
                    assert_eq!(stats.documents as u64, large_count);
                    assert_eq!(documents, large_count);
                }
                Err(e) => {
                    assert!(e.is_cancellation(), "unexpected error: {}", e);
                    assert_eq!(documents, 4, "failed write left {} rows", documents);
                    interrupted += 1;
                }
            }
            assert_mirror_in_step(&store)?;
        }
    }
    assert!(interrupted > 0);

    // Still writable afterwards
    store.update(&background, ProjectSource::new(&small))?;
    assert_eq!(store.search(&background, &SearchQuery::new("Hello"))?.len(), 1);
    Ok(())
}
