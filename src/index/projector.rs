//! Flattening the project model into searchable documents
//!
//! The walk order is fixed: project metadata, bible (characters, locations,
//! tags), then issues -> pages -> panels -> balloons, then the script text.
//! Each non-blank field becomes one `Document` addressed by a structural path:
//!
//! - `project:<field>`
//! - `bible:<kind>:<name>`
//! - `issue:<n>/page:<number>/panel:<id>`
//! - `issue:<n>/page:<number>/panel:<id>/balloon:<id>`
//! - `script:<filename>`
//!
//! `<n>` is the issue's 1-based position in `Project::issues`, not a stored
//! number, so reordering issues changes their paths.

use crate::model::{Balloon, BibleEntry, ProjectSource};
use unicode_normalization::UnicodeNormalization;

/// Type tag stored with every document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    ProjectName,
    ProjectAuthor,
    ProjectDescription,
    Character,
    CharacterAlias,
    CharacterNotes,
    Location,
    LocationAlias,
    LocationNotes,
    Tag,
    TagAlias,
    TagNotes,
    Panel,
    Balloon,
    Script,
}

impl DocKind {
    pub const ALL: [DocKind; 15] = [
        DocKind::ProjectName,
        DocKind::ProjectAuthor,
        DocKind::ProjectDescription,
        DocKind::Character,
        DocKind::CharacterAlias,
        DocKind::CharacterNotes,
        DocKind::Location,
        DocKind::LocationAlias,
        DocKind::LocationNotes,
        DocKind::Tag,
        DocKind::TagAlias,
        DocKind::TagNotes,
        DocKind::Panel,
        DocKind::Balloon,
        DocKind::Script,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::ProjectName => "project_name",
            DocKind::ProjectAuthor => "project_author",
            DocKind::ProjectDescription => "project_description",
            DocKind::Character => "character",
            DocKind::CharacterAlias => "character_alias",
            DocKind::CharacterNotes => "character_notes",
            DocKind::Location => "location",
            DocKind::LocationAlias => "location_alias",
            DocKind::LocationNotes => "location_notes",
            DocKind::Tag => "tag",
            DocKind::TagAlias => "tag_alias",
            DocKind::TagNotes => "tag_notes",
            DocKind::Panel => "panel",
            DocKind::Balloon => "balloon",
            DocKind::Script => "script",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One searchable row, before it has a database id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub kind: DocKind,
    pub path: String,

    /// Page number for page-scoped documents
    pub page_id: Option<i64>,

    /// 1-based position of the related bible character
    pub character_id: Option<i64>,

    pub text: String,
}

/// Directed edge between two projected documents, by position in the projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocLink {
    pub from: usize,
    pub to: usize,
}

#[derive(Clone, Copy)]
enum BibleKind {
    Character,
    Location,
    Tag,
}

impl BibleKind {
    fn label(self) -> &'static str {
        match self {
            BibleKind::Character => "character",
            BibleKind::Location => "location",
            BibleKind::Tag => "tag",
        }
    }

    /// (name, alias list, notes) tags for this kind
    fn kinds(self) -> (DocKind, DocKind, DocKind) {
        match self {
            BibleKind::Character => (
                DocKind::Character,
                DocKind::CharacterAlias,
                DocKind::CharacterNotes,
            ),
            BibleKind::Location => (
                DocKind::Location,
                DocKind::LocationAlias,
                DocKind::LocationNotes,
            ),
            BibleKind::Tag => (DocKind::Tag, DocKind::TagAlias, DocKind::TagNotes),
        }
    }
}

/// NFC-normalize and trim; `None` when nothing is left
pub fn clean_text(raw: &str) -> Option<String> {
    let normalized: String = raw.nfc().collect();
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Balloon text: its runs, trimmed and joined with single spaces
pub fn balloon_text(balloon: &Balloon) -> Option<String> {
    let joined = balloon
        .runs
        .iter()
        .filter_map(|run| clean_text(&run.text))
        .collect::<Vec<_>>()
        .join(" ");
    clean_text(&joined)
}

/// Builds the document list for one project
struct Projector<'a> {
    source: ProjectSource<'a>,
    docs: Vec<Document>,
}

impl<'a> Projector<'a> {
    fn push(
        &mut self,
        kind: DocKind,
        path: &str,
        page_id: Option<i64>,
        character_id: Option<i64>,
        raw: &str,
    ) {
        if let Some(text) = clean_text(raw) {
            self.docs.push(Document {
                kind,
                path: path.to_string(),
                page_id,
                character_id,
                text,
            });
        }
    }

    fn project_meta(&mut self) {
        let meta = &self.source.project.meta;
        self.push(DocKind::ProjectName, "project:name", None, None, &meta.name);
        self.push(DocKind::ProjectAuthor, "project:author", None, None, &meta.author);
        self.push(
            DocKind::ProjectDescription,
            "project:description",
            None,
            None,
            &meta.description,
        );
    }

    fn bible(&mut self) {
        let bible = &self.source.project.bible;
        self.bible_entries(BibleKind::Character, &bible.characters);
        self.bible_entries(BibleKind::Location, &bible.locations);
        self.bible_entries(BibleKind::Tag, &bible.tags);
    }

    fn bible_entries(&mut self, kind: BibleKind, entries: &[BibleEntry]) {
        let (name_kind, alias_kind, notes_kind) = kind.kinds();

        for (idx, entry) in entries.iter().enumerate() {
            // An unnamed entry has no addressable path
            let Some(name) = clean_text(&entry.name) else {
                continue;
            };
            let path = format!("bible:{}:{}", kind.label(), name);
            let character_id = matches!(kind, BibleKind::Character).then_some(idx as i64 + 1);

            self.push(name_kind, &path, None, character_id, &name);
            let aliases = entry
                .aliases
                .iter()
                .filter_map(|a| clean_text(a))
                .collect::<Vec<_>>()
                .join(" ");
            self.push(alias_kind, &path, None, character_id, &aliases);
            self.push(notes_kind, &path, None, character_id, &entry.notes);
        }
    }

    fn issues(&mut self) {
        let project = self.source.project;
        for (issue_idx, issue) in project.issues.iter().enumerate() {
            let issue_no = issue_idx + 1;
            for page in &issue.pages {
                let page_id = Some(page.number as i64);
                for (panel_idx, panel) in page.panels.iter().enumerate() {
                    let panel_id = segment_id(&panel.id, panel_idx);
                    let panel_path =
                        format!("issue:{}/page:{}/panel:{}", issue_no, page.number, panel_id);
                    self.push(DocKind::Panel, &panel_path, page_id, None, &panel.notes);

                    for (balloon_idx, balloon) in panel.balloons.iter().enumerate() {
                        let Some(text) = balloon_text(balloon) else {
                            continue;
                        };
                        let path = format!(
                            "{}/balloon:{}",
                            panel_path,
                            segment_id(&balloon.id, balloon_idx)
                        );
                        let character_id = self.speaker_id(balloon);
                        self.push(DocKind::Balloon, &path, page_id, character_id, &text);
                    }
                }
            }
        }
    }

    fn script(&mut self) {
        if let Some(script) = self.source.script {
            let name = clean_text(&script.filename).unwrap_or_else(|| "untitled".to_string());
            self.push(DocKind::Script, &format!("script:{}", name), None, None, &script.text);
        }
    }

    /// Bible position of the balloon's speaker, matched on name or alias
    fn speaker_id(&self, balloon: &Balloon) -> Option<i64> {
        let speaker = clean_text(balloon.character.as_deref()?)?;
        self.source
            .project
            .bible
            .characters
            .iter()
            .position(|c| {
                clean_text(&c.name).is_some_and(|n| n.eq_ignore_ascii_case(&speaker))
                    || c.aliases
                        .iter()
                        .filter_map(|a| clean_text(a))
                        .any(|a| a.eq_ignore_ascii_case(&speaker))
            })
            .map(|idx| idx as i64 + 1)
    }
}

/// Trimmed id, or the 1-based position when the id is blank
fn segment_id(id: &str, idx: usize) -> String {
    clean_text(id).unwrap_or_else(|| (idx + 1).to_string())
}

/// Flatten the model (and script) into documents, in walk order
pub fn project(source: ProjectSource<'_>) -> Vec<Document> {
    let mut projector = Projector {
        source,
        docs: Vec::new(),
    };
    projector.project_meta();
    projector.bible();
    projector.issues();
    projector.script();
    projector.docs
}

/// Speaker edges: each attributed balloon points at its character's name document
pub fn speaker_links(docs: &[Document]) -> Vec<DocLink> {
    docs.iter()
        .enumerate()
        .filter(|(_, d)| d.kind == DocKind::Balloon)
        .filter_map(|(from, d)| {
            let character = d.character_id?;
            docs.iter()
                .position(|t| t.kind == DocKind::Character && t.character_id == Some(character))
                .map(|to| DocLink { from, to })
        })
        .collect()
}
