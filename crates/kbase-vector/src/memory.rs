use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use kbase_core::error::{Error, Result};
use kbase_core::traits::VectorIndex;
use kbase_core::types::{IndexEntry, Namespace, ScoredEntry};

/// In-process index with exact cosine search. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    partitions: RwLock<HashMap<Namespace, Vec<IndexEntry>>>,
}

impl MemoryIndex {
    pub fn new() -> Self { Self::default() }

    /// Number of entries held for `namespace`.
    pub fn len(&self, namespace: &Namespace) -> usize {
        self.partitions
            .read()
            .map(|p| p.get(namespace).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &Namespace) -> bool { self.len(namespace) == 0 }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

impl VectorIndex for MemoryIndex {
    fn write(&self, namespace: &Namespace, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() { return Ok(()); }
        let mut partitions = self.partitions.write().map_err(|e| Error::store(format!("lock poisoned: {e}")))?;
        partitions.entry(namespace.clone()).or_default().extend(entries);
        Ok(())
    }

    fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<ScoredEntry>> {
        let partitions = self.partitions.read().map_err(|e| Error::store(format!("lock poisoned: {e}")))?;
        let Some(entries) = partitions.get(namespace) else { return Ok(Vec::new()) };
        let mut scored: Vec<ScoredEntry> = entries
            .iter()
            .map(|e| ScoredEntry { text: e.text.clone(), meta: e.meta.clone(), score: cosine(vector, &e.vector) })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    fn delete_all(&self, namespace: &Namespace) -> Result<()> {
        let mut partitions = self.partitions.write().map_err(|e| Error::store(format!("lock poisoned: {e}")))?;
        partitions.remove(namespace);
        Ok(())
    }

    fn describe_partitions(&self) -> Result<BTreeSet<Namespace>> {
        let partitions = self.partitions.read().map_err(|e| Error::store(format!("lock poisoned: {e}")))?;
        Ok(partitions.iter().filter(|(_, v)| !v.is_empty()).map(|(k, _)| k.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbase_core::types::Meta;

    fn entry(text: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry { vector, text: text.into(), meta: Meta::new() }
    }

    #[test]
    fn namespaces_are_isolated_and_ranked() {
        let idx = MemoryIndex::new();
        let a = Namespace::new("a").unwrap();
        let b = Namespace::new("b").unwrap();
        idx.write(&a, vec![entry("x", vec![1.0, 0.0]), entry("y", vec![0.6, 0.8]), entry("z", vec![0.0, 1.0])]).unwrap();
        idx.write(&b, vec![entry("other", vec![1.0, 0.0])]).unwrap();

        let hits = idx.query(&a, &[1.0, 0.0], 2).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "y"]);
        assert!(hits[0].score >= hits[1].score);

        assert_eq!(idx.describe_partitions().unwrap().len(), 2);
        idx.delete_all(&a).unwrap();
        assert!(idx.query(&a, &[1.0, 0.0], 3).unwrap().is_empty());
        assert_eq!(idx.describe_partitions().unwrap().into_iter().collect::<Vec<_>>(), vec![b]);
        // deleting an absent namespace is fine
        idx.delete_all(&a).unwrap();
    }
}
