use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while ingesting or querying a knowledge base.
///
/// A failed ingest leaves no guarantee about which chunks were persisted;
/// callers retry the whole document.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unreadable file {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("embedding failure: {0}")]
    Embedding(String),

    #[error("store failure: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestErrorKind {
    UnreadableFile,
    EmbeddingFailure,
    StoreFailure,
}

impl IngestError {
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            Self::UnreadableFile { .. } => IngestErrorKind::UnreadableFile,
            Self::Embedding(_) => IngestErrorKind::EmbeddingFailure,
            Self::Store(_) => IngestErrorKind::StoreFailure,
        }
    }
}

impl fmt::Display for IngestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnreadableFile => "unreadable-file",
            Self::EmbeddingFailure => "embedding-failure",
            Self::StoreFailure => "store-failure",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Retrieval engine is not initialized: {0}")]
    NotInitialized(String),

    #[error("Invalid namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Ingest(IngestError::UnreadableFile { path: path.into(), reason: reason.to_string() })
    }

    pub fn embedding(err: impl fmt::Display) -> Self {
        Self::Ingest(IngestError::Embedding(err.to_string()))
    }

    pub fn store(err: impl fmt::Display) -> Self {
        Self::Ingest(IngestError::Store(err.to_string()))
    }

    /// The ingest failure kind, if this is an ingest/query failure.
    pub fn ingest_kind(&self) -> Option<IngestErrorKind> {
        match self {
            Self::Ingest(e) => Some(e.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
