//! Ranked full-text search over the project index
//!
//! Query text is reduced to word tokens and turned into an FTS5 expression:
//! every token must match, and the last one matches as a prefix so results
//! update while the user is still typing.

use crate::context::Context;
use crate::error::{IndexError, Result};
use crate::storage::store::IndexStore;
use regex::Regex;
use rusqlite::types::ToSql;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{M}\p{N}]+").expect("word pattern is valid"));

/// A search request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub text: String,

    /// Lowest page number to include
    pub page_from: Option<u32>,

    /// Highest page number to include
    pub page_to: Option<u32>,

    /// Maximum hits; 0 means the configured default
    pub limit: usize,

    /// Restrict to these document type tags (empty = all)
    pub types: Vec<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn pages(mut self, from: Option<u32>, to: Option<u32>) -> Self {
        self.page_from = from;
        self.page_to = to;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// One ranked hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub path: String,

    #[serde(rename = "type")]
    pub doc_type: String,

    /// Page number, or `None` for documents that are not page-scoped
    pub page_id: Option<u32>,

    pub snippet: String,

    /// bm25 score; lower is more relevant
    pub score: f64,
}

/// Build the FTS5 match expression for free text; `None` when there is nothing to match
pub fn match_expression(text: &str) -> Option<String> {
    let tokens: Vec<&str> = WORD.find_iter(text).map(|m| m.as_str()).collect();
    let (last, rest) = tokens.split_last()?;

    let mut terms: Vec<String> = rest.iter().map(|t| format!("\"{}\"", t)).collect();
    terms.push(format!("\"{}\"*", last));
    Some(terms.join(" "))
}

impl IndexStore {
    /// Ranked, filtered full-text search with snippets
    pub fn search(&self, ctx: &Context, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let op = "search";
        ctx.check(op)?;

        let Some(expression) = match_expression(&query.text) else {
            return Ok(Vec::new());
        };
        if let (Some(from), Some(to)) = (query.page_from, query.page_to) {
            if from > to {
                return Ok(Vec::new());
            }
        }

        let config = self.config();
        let limit = config.effective_limit(query.limit);

        let mut sql = String::from(
            "SELECT d.path, d.type, d.page_id,
                    snippet(documents_fts, 0, ?2, ?3, ?4, ?5),
                    bm25(documents_fts) AS score
             FROM documents_fts
             JOIN documents d ON d.doc_id = documents_fts.rowid
             WHERE documents_fts MATCH ?1
               AND (?6 IS NULL OR d.page_id >= ?6)
               AND (?7 IS NULL OR d.page_id <= ?7)",
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![
            Box::new(expression),
            Box::new(config.snippet_open.clone()),
            Box::new(config.snippet_close.clone()),
            Box::new(config.snippet_ellipsis.clone()),
            Box::new(config.snippet_tokens),
            Box::new(query.page_from),
            Box::new(query.page_to),
        ];

        if !query.types.is_empty() {
            let first = params.len() + 1;
            let slots: Vec<String> = (first..first + query.types.len())
                .map(|i| format!("?{}", i))
                .collect();
            sql.push_str(&format!(" AND d.type IN ({})", slots.join(", ")));
            for t in &query.types {
                params.push(Box::new(t.clone()));
            }
        }

        sql.push_str(&format!(" ORDER BY score, d.doc_id LIMIT {}", limit));

        self.with_conn(ctx, op, |conn| {
            let mut stmt = conn.prepare(&sql).map_err(IndexError::db(op))?;
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(param_refs.as_slice(), |row| {
                    Ok(SearchHit {
                        path: row.get(0)?,
                        doc_type: row.get(1)?,
                        page_id: row.get::<_, Option<i64>>(2)?.map(|p| p as u32),
                        snippet: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        score: row.get(4)?,
                    })
                })
                .map_err(IndexError::db(op))?;

            let mut hits = Vec::new();
            for hit in rows {
                hits.push(hit.map_err(IndexError::db(op))?);
            }
            log::debug!("Search '{}' returned {} hits", query.text, hits.len());
            Ok(hits)
        })
    }
}
