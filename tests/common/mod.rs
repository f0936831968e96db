//! Shared project fixtures for the integration tests

#![allow(dead_code)]

use panel_index::Project;
use serde_json::json;

/// One issue, one page, one panel with a single balloon spoken by ALICE
pub fn night_shift() -> Project {
    serde_json::from_value(json!({
        "meta": { "name": "Night Shift", "author": "", "description": "" },
        "bible": {
            "characters": [ { "name": "ALICE", "aliases": [], "notes": "" } ]
        },
        "issues": [ {
            "title": "Issue One",
            "pages": [ {
                "number": 1,
                "panels": [ {
                    "id": "p1",
                    "notes": "close up",
                    "balloons": [ {
                        "id": "b1",
                        "character": "ALICE",
                        "runs": [ { "text": "Hello, world!" } ]
                    } ]
                } ]
            } ]
        } ]
    }))
    .expect("fixture is valid")
}

/// `pages` pages, each with one panel and one balloon mentioning a lantern
pub fn lantern_pages(pages: u32) -> Project {
    let pages: Vec<_> = (1..=pages)
        .map(|n| {
            json!({
                "number": n,
                "panels": [ {
                    "id": format!("p{}", n),
                    "notes": format!("wide shot of street {}", n),
                    "balloons": [ {
                        "id": "b1",
                        "character": "BOB",
                        "runs": [ { "text": "Hold the lantern" }, { "text": format!("higher {}", n) } ]
                    } ]
                } ]
            })
        })
        .collect();

    serde_json::from_value(json!({
        "meta": { "name": "Lantern Alley" },
        "bible": {
            "characters": [ { "name": "BOB", "aliases": ["Bobby"], "notes": "carries a lantern" } ],
            "locations": [ { "name": "Alley", "notes": "narrow and dark" } ]
        },
        "issues": [ { "title": "One", "pages": pages } ]
    }))
    .expect("fixture is valid")
}

/// A single page holding `count` balloons that all say "echo"
pub fn echo_chamber(count: usize) -> Project {
    let balloons: Vec<_> = (1..=count)
        .map(|i| json!({ "id": format!("b{}", i), "runs": [ { "text": format!("echo {}", i) } ] }))
        .collect();

    serde_json::from_value(json!({
        "meta": { "name": "Echo" },
        "issues": [ { "pages": [ { "number": 1, "panels": [ { "id": "p1", "balloons": balloons } ] } ] } ]
    }))
    .expect("fixture is valid")
}
