use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use kbase_core::config::Settings;
use kbase_core::error::{Error, Result};
use kbase_core::loader::{load_documents, source_label};
use kbase_core::traits::{Embedder, VectorIndex};
use kbase_core::types::{
    Chunk, IndexEntry, Meta, Namespace, Passage, Retrieval, META_CHUNK_INDEX, META_CONTENT_HASH, META_INGESTED_AT,
    META_PAGE, META_SOURCE,
};
use kbase_core::{Chunker, ChunkingConfig};

use crate::reset::ResetReport;
use crate::state::{EngineState, EngineStatus};

/// Process-wide engine parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub chunking: ChunkingConfig,
    pub default_namespace: Namespace,
    pub sample_document: PathBuf,
}

impl EngineOptions {
    pub fn new(chunking: ChunkingConfig, default_namespace: Namespace, sample_document: impl Into<PathBuf>) -> Result<Self> {
        chunking.validate()?;
        Ok(Self { chunking, default_namespace, sample_document: sample_document.into() })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Self::new(settings.chunking, settings.default_namespace()?, settings.sample_document_path())
    }
}

/// Ingests documents into a namespaced vector index and answers similarity
/// queries against it.
///
/// The engine keeps no chunks or vectors of its own. Concurrent calls are
/// independent; consistency between them is whatever the index provides.
pub struct RetrievalEngine<E, V> {
    state: EngineState<E, V>,
    chunker: Chunker,
    options: EngineOptions,
}

impl<E: Embedder, V: VectorIndex> RetrievalEngine<E, V> {
    pub fn ready(embedder: E, index: V, options: EngineOptions) -> Result<Self> {
        let chunker = Chunker::new(options.chunking)?;
        info!(default_namespace = %options.default_namespace, "retrieval engine ready");
        Ok(Self { state: EngineState::Ready { embedder, index }, chunker, options })
    }

    pub fn disabled(reason: impl Into<String>, options: EngineOptions) -> Result<Self> {
        let chunker = Chunker::new(options.chunking)?;
        let reason = reason.into();
        warn!(%reason, "retrieval engine disabled; searches will return no context");
        Ok(Self { state: EngineState::Disabled { reason }, chunker, options })
    }

    pub fn status(&self) -> EngineStatus {
        match &self.state {
            EngineState::Ready { .. } => EngineStatus::Ready,
            EngineState::Disabled { reason } => EngineStatus::Disabled { reason: reason.clone() },
        }
    }

    pub fn default_namespace(&self) -> &Namespace {
        &self.options.default_namespace
    }

    fn ready_parts(&self) -> Result<(&E, &V)> {
        match &self.state {
            EngineState::Ready { embedder, index } => Ok((embedder, index)),
            EngineState::Disabled { reason } => Err(Error::NotInitialized(reason.clone())),
        }
    }

    /// Load, chunk, embed and write one file. Returns the number of chunks written.
    ///
    /// `source` defaults to the file name. Re-ingesting a file adds a second,
    /// independent copy of its chunks.
    pub fn ingest(&self, path: &Path, namespace: Option<&str>, source: Option<&str>) -> Result<usize> {
        let (embedder, index) = self.ready_parts()?;
        let namespace = Namespace::resolve(namespace, &self.options.default_namespace)?;
        let source = source.map_or_else(|| source_label(path), str::to_string);
        self.ingest_into(embedder, index, path, &namespace, &source)
    }

    fn ingest_into(&self, embedder: &E, index: &V, path: &Path, namespace: &Namespace, source: &str) -> Result<usize> {
        let documents = load_documents(path, source)?;
        let chunks = self.chunker.split(&documents);
        if chunks.is_empty() {
            info!(namespace = %namespace, source, "document has no text; nothing to ingest");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!("embedder returned {} vectors for {} chunks", vectors.len(), chunks.len())));
        }

        let ingested_at = Utc::now().timestamp_millis().to_string();
        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { vector, text: chunk.text.clone(), meta: chunk_meta(chunk, &ingested_at) })
            .collect();
        let count = entries.len();
        index.write(namespace, entries)?;
        info!(namespace = %namespace, source, chunks = count, "ingested document");
        Ok(count)
    }

    /// Top-`k` passages from `namespace`, best first.
    ///
    /// A disabled engine or an empty namespace yields an empty retrieval, not an error.
    pub fn search(&self, query: &str, k: usize, namespace: Option<&str>) -> Result<Retrieval> {
        let namespace = Namespace::resolve(namespace, &self.options.default_namespace)?;
        let (embedder, index) = match &self.state {
            EngineState::Ready { embedder, index } => (embedder, index),
            EngineState::Disabled { .. } => {
                debug!(namespace = %namespace, "engine disabled; returning no context");
                return Ok(Retrieval::empty(namespace));
            }
        };
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }

        let vector = embedder.embed(query)?;
        let mut hits = index.query(&namespace, &vector, k)?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        let passages: Vec<Passage> = hits.into_iter().map(Passage::from).collect();
        if passages.is_empty() {
            warn!(namespace = %namespace, "no passages found; proceeding without context");
        } else {
            debug!(namespace = %namespace, k, hits = passages.len(), "search complete");
        }
        Ok(Retrieval { namespace, passages })
    }

    /// Namespaces holding data, or just the default namespace when there are
    /// none or the index cannot be listed. Never fails.
    pub fn list_namespaces(&self) -> BTreeSet<Namespace> {
        let fallback = || BTreeSet::from([self.options.default_namespace.clone()]);
        let EngineState::Ready { index, .. } = &self.state else { return fallback() };
        match index.describe_partitions() {
            Ok(names) if !names.is_empty() => names,
            Ok(_) => fallback(),
            Err(e) => {
                warn!(error = %e, "listing namespaces failed; using default");
                fallback()
            }
        }
    }

    /// Wipe every namespace, then re-ingest the sample document into the
    /// default namespace.
    ///
    /// Best effort and not transactional: a namespace that fails to delete is
    /// recorded and skipped, and a failed namespace listing clears only the
    /// default namespace. Both, like a missing sample document, are reported
    /// through [`ResetReport::succeeded`] rather than as an error.
    pub fn reset_index(&self) -> Result<ResetReport> {
        let (embedder, index) = self.ready_parts()?;
        let default_ns = &self.options.default_namespace;

        let (mut targets, listing_error) = match index.describe_partitions() {
            Ok(names) => (names, None),
            Err(e) => {
                warn!(error = %e, "could not enumerate namespaces; clearing default only");
                (BTreeSet::new(), Some(e.to_string()))
            }
        };
        targets.insert(default_ns.clone());

        let initial = ResetReport { listing_error, ..ResetReport::default() };
        let report = targets.into_iter().fold(initial, |report, ns| {
            let outcome = index.delete_all(&ns);
            if let Err(e) = &outcome {
                error!(namespace = %ns, error = %e, "failed to clear namespace; continuing");
            }
            report.record(ns, outcome)
        });

        let sample = &self.options.sample_document;
        if !sample.is_file() {
            error!(path = %sample.display(), "sample document missing; default namespace left empty");
            return Ok(report);
        }
        let label = source_label(sample);
        let restored = self.ingest_into(embedder, index, sample, default_ns, &label)?;
        info!(cleared = report.cleared.len(), failed = report.failed.len(), restored, "index reset");
        Ok(ResetReport { sample_chunks: Some(restored), ..report })
    }
}

fn chunk_meta(chunk: &Chunk, ingested_at: &str) -> Meta {
    let mut meta = Meta::new();
    meta.insert(META_SOURCE.to_string(), chunk.source.clone());
    if let Some(page) = chunk.page {
        meta.insert(META_PAGE.to_string(), page.to_string());
    }
    meta.insert(META_CHUNK_INDEX.to_string(), chunk.index.to_string());
    meta.insert(META_CONTENT_HASH.to_string(), blake3::hash(chunk.text.as_bytes()).to_hex().to_string());
    meta.insert(META_INGESTED_AT.to_string(), ingested_at.to_string());
    meta
}
