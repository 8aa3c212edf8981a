//! Core types, collaborator traits, error taxonomy, document loading,
//! chunking and configuration for the knowledge base retrieval engine.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{Chunker, ChunkingConfig};
pub use error::{Error, IngestError, IngestErrorKind, Result};
pub use traits::{Embedder, VectorIndex};
pub use types::{Chunk, Document, IndexEntry, Meta, Namespace, Passage, Retrieval, ScoredEntry};
