//! The authoritative project model, as seen by the index
//!
//! The editor owns the real model and its mutation API; the index only reads
//! it. These types describe the shape the projector walks. They deserialize
//! from the project JSON so the CLI (and tests) can load a model from disk.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A comic project: metadata, bible and issues
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub meta: ProjectMeta,
    pub bible: Bible,
    pub issues: Vec<Issue>,
}

/// Project-level metadata fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMeta {
    pub name: String,
    pub author: String,
    pub description: String,
}

/// Reference material: characters, locations and tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bible {
    pub characters: Vec<BibleEntry>,
    pub locations: Vec<BibleEntry>,
    pub tags: Vec<BibleEntry>,
}

/// One named bible entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BibleEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub title: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub number: u32,
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Panel {
    pub id: String,
    pub notes: String,
    pub balloons: Vec<Balloon>,
}

/// A speech/thought/caption balloon made of styled text runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Balloon {
    pub id: String,

    /// Name of the bible character speaking, if attributed
    pub character: Option<String>,

    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Raw text of the project's script file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptSource {
    pub filename: String,
    pub text: String,
}

impl ScriptSource {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
        }
    }

    /// Read a script file, keeping only its file name for the index path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self { filename, text })
    }
}

impl Project {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Everything the index is derived from: the model plus its script text
#[derive(Debug, Clone, Copy)]
pub struct ProjectSource<'a> {
    pub project: &'a Project,
    pub script: Option<&'a ScriptSource>,
}

impl<'a> ProjectSource<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            script: None,
        }
    }

    pub fn with_script(mut self, script: &'a ScriptSource) -> Self {
        self.script = Some(script);
        self
    }
}
