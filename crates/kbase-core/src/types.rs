//! Domain types shared by the loader, chunker, index backends and engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};

pub type Meta = BTreeMap<String, String>;

pub const META_SOURCE: &str = "source";
pub const META_PAGE: &str = "page";
pub const META_CHUNK_INDEX: &str = "chunk_index";
pub const META_CONTENT_HASH: &str = "content_hash";
pub const META_INGESTED_AT: &str = "ingested_at";

/// Grounding text used when a retrieval came back empty.
pub const NO_CONTEXT: &str = "No specific knowledge base context available.";

const MAX_NAMESPACE_LEN: usize = 128;

/// A unit of loaded text. Transient: lives only for the duration of an ingest.
///
/// `page` is 1-based and only set for paginated sources (PDF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self { text: text.into(), source: source.into(), page: None }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// A bounded substring of a [`Document`], the unit stored in the index.
///
/// - `index`: position of the chunk within its document
/// - `offset`: start of the chunk in characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    pub index: usize,
    pub offset: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A named partition of the vector index.
///
/// Names are trimmed, non-empty and restricted to `[A-Za-z0-9_.-]` so they
/// map directly onto backend partitions (e.g. table names).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() || name.len() > MAX_NAMESPACE_LEN {
            return Err(Error::InvalidNamespace(name.to_string()));
        }
        let valid = name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(Error::InvalidNamespace(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Use `explicit` when given, falling back to `default` when omitted.
    pub fn resolve(explicit: Option<&str>, default: &Namespace) -> Result<Self> {
        match explicit {
            Some(name) => Self::new(name),
            None => Ok(default.clone()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

/// What gets written to the index: one embedded chunk.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub text: String,
    pub meta: Meta,
}

/// What the index returns for a nearest-neighbour query. Higher score is better.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub text: String,
    pub meta: Meta,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
    pub score: f32,
    pub meta: Meta,
}

impl From<ScoredEntry> for Passage {
    fn from(e: ScoredEntry) -> Self {
        let source = e.meta.get(META_SOURCE).cloned().unwrap_or_else(|| "unknown".to_string());
        Self { text: e.text, source, score: e.score, meta: e.meta }
    }
}

/// Passages for one query, best first. Never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retrieval {
    pub namespace: Namespace,
    pub passages: Vec<Passage>,
}

impl Retrieval {
    pub fn empty(namespace: Namespace) -> Self {
        Self { namespace, passages: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Distinct source labels in rank order.
    pub fn sources(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.passages
            .iter()
            .map(|p| p.source.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Passage texts joined by blank lines, or [`NO_CONTEXT`] when empty.
    pub fn context(&self) -> String {
        if self.passages.is_empty() {
            return NO_CONTEXT.to_string();
        }
        self.passages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n\n")
    }
}
