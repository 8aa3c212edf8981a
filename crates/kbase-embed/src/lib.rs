//! Embedding clients: a local XLM-RoBERTa (BGE-M3) model on candle and a
//! deterministic hashing embedder for development and tests.

pub mod hash;
pub mod local;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use local::LocalEmbedder;
pub use pool::masked_mean_l2;

use kbase_core::config::{EmbeddingProvider, EmbeddingSettings};
use kbase_core::error::{Error, Result};
use kbase_core::traits::Embedder;
use tracing::info;

/// Build the embedder selected by `settings`. A model that cannot be loaded
/// is a configuration error.
pub fn default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::Hash => {
            info!(dim = settings.dim, "using hash embedder");
            Ok(Box::new(HashEmbedder::new(settings.dim)?))
        }
        EmbeddingProvider::Local => {
            let model = LocalEmbedder::load(settings).map_err(|e| Error::config(format!("embedding model: {e:#}")))?;
            Ok(Box::new(model))
        }
    }
}
