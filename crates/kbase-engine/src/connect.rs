use tracing::warn;

use kbase_core::config::{IndexBackend, Settings};
use kbase_core::error::Result;
use kbase_core::traits::{Embedder, VectorIndex};
use kbase_embed::default_embedder;
use kbase_vector::{LanceIndex, MemoryIndex};

use crate::engine::{EngineOptions, RetrievalEngine};

pub type DynEngine = RetrievalEngine<Box<dyn Embedder>, Box<dyn VectorIndex>>;

/// Build an engine from settings.
///
/// An unconfigured or unreachable index yields a disabled engine rather than
/// an error. Invalid settings and an embedding model that cannot be loaded
/// are errors.
pub fn connect(settings: &Settings) -> Result<DynEngine> {
    let options = EngineOptions::from_settings(settings)?;

    let index: Box<dyn VectorIndex> = match settings.index.backend {
        IndexBackend::Memory => Box::new(MemoryIndex::new()),
        IndexBackend::Lance => {
            let Some(uri) = settings.index.uri.as_deref() else {
                return RetrievalEngine::disabled("index.uri is not configured", options);
            };
            match LanceIndex::open(uri, &settings.index.table_prefix) {
                Ok(index) => Box::new(index),
                Err(e) => {
                    warn!(uri, error = %e, "vector index unavailable");
                    return RetrievalEngine::disabled(format!("vector index unavailable: {e}"), options);
                }
            }
        }
    };

    let embedder = default_embedder(&settings.embedding)?;
    RetrievalEngine::ready(embedder, index, options)
}
