use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::types::{IndexEntry, Namespace, ScoredEntry};

/// Maps text to fixed-size vectors. Failures surface as embedding failures.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    /// Order-preserving: `out[i]` is the embedding of `texts[i]`.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::embedding("embedder returned no vector"))
    }
}

/// Namespaced nearest-neighbour store. Failures surface as store failures.
///
/// The index is the system of record; implementations own their own
/// consistency and the engine adds no locking on top.
pub trait VectorIndex: Send + Sync {
    fn write(&self, namespace: &Namespace, entries: Vec<IndexEntry>) -> Result<()>;

    /// At most `k` entries, best first.
    fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<ScoredEntry>>;

    /// Removes every entry in `namespace`. Deleting an absent namespace is not an error.
    fn delete_all(&self, namespace: &Namespace) -> Result<()>;

    /// Namespaces currently holding at least one entry.
    fn describe_partitions(&self) -> Result<BTreeSet<Namespace>>;
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dim(&self) -> usize { (**self).dim() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
    fn embed(&self, text: &str) -> Result<Vec<f32>> { (**self).embed(text) }
}

impl<T: VectorIndex + ?Sized> VectorIndex for Box<T> {
    fn write(&self, namespace: &Namespace, entries: Vec<IndexEntry>) -> Result<()> { (**self).write(namespace, entries) }
    fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<ScoredEntry>> { (**self).query(namespace, vector, k) }
    fn delete_all(&self, namespace: &Namespace) -> Result<()> { (**self).delete_all(namespace) }
    fn describe_partitions(&self) -> Result<BTreeSet<Namespace>> { (**self).describe_partitions() }
}

impl<T: VectorIndex + ?Sized> VectorIndex for std::sync::Arc<T> {
    fn write(&self, namespace: &Namespace, entries: Vec<IndexEntry>) -> Result<()> { (**self).write(namespace, entries) }
    fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<ScoredEntry>> { (**self).query(namespace, vector, k) }
    fn delete_all(&self, namespace: &Namespace) -> Result<()> { (**self).delete_all(namespace) }
    fn describe_partitions(&self) -> Result<BTreeSet<Namespace>> { (**self).describe_partitions() }
}
