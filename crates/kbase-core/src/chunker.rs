use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Length-based chunking parameters, in characters.
///
/// `0 <= overlap < max_chars` so that every step advances by at least one
/// character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 1000, overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self> {
        let config = Self { max_chars, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            return Err(Error::config("chunking.max_chars must be greater than zero"));
        }
        if self.overlap >= self.max_chars {
            return Err(Error::config(format!(
                "chunking.overlap ({}) must be smaller than chunking.max_chars ({})",
                self.overlap, self.max_chars
            )));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.max_chars - self.overlap
    }
}

/// Splits documents into overlapping, fixed-width windows.
///
/// No sentence or paragraph detection: a text of `L` characters yields one
/// chunk when `L <= max_chars`, otherwise windows start at every multiple of
/// the stride below `L` and the last window holds whatever text remains.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunks for all documents, in document order. Empty documents yield nothing.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text).into_iter().enumerate().map(|(index, (offset, text))| Chunk {
                    text,
                    source: doc.source.clone(),
                    page: doc.page,
                    index,
                    offset,
                })
            })
            .collect()
    }

    /// `(char_offset, text)` windows over `text`.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        // byte position of every char boundary, including the end
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let len = bounds.len() - 1;
        if len == 0 {
            return Vec::new();
        }
        if len <= self.config.max_chars {
            return vec![(0, text.to_string())];
        }
        let stride = self.config.stride();
        (0..len)
            .step_by(stride)
            .map(|start| {
                let end = (start + self.config.max_chars).min(len);
                (start, text[bounds[start]..bounds[end]].to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig::new(max, overlap).unwrap()).unwrap()
    }

    #[test]
    fn rejects_overlap_not_below_max() {
        assert!(matches!(ChunkingConfig::new(100, 100), Err(Error::Config(_))));
        assert!(matches!(ChunkingConfig::new(100, 150), Err(Error::Config(_))));
        assert!(matches!(ChunkingConfig::new(0, 0), Err(Error::Config(_))));
        assert!(ChunkingConfig::new(100, 0).is_ok());
        let bad = ChunkingConfig { max_chars: 10, overlap: 10 };
        assert!(Chunker::new(bad).is_err());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let c = chunker(10, 3);
        assert_eq!(c.split_text("exactly10!"), vec![(0, "exactly10!".to_string())]);
        assert_eq!(c.split_text("tiny"), vec![(0, "tiny".to_string())]);
        assert!(c.split_text("").is_empty());
    }

    #[test]
    fn windows_overlap_and_last_is_kept() {
        let c = chunker(4, 1);
        let out = c.split_text("abcdefghij");
        let texts: Vec<&str> = out.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij", "j"]);
        let offsets: Vec<usize> = out.iter().map(|(o, _)| *o).collect();
        assert_eq!(offsets, vec![0, 3, 6, 9]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let c = chunker(3, 1);
        let out = c.split_text("ééééé");
        let texts: Vec<&str> = out.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["ééé", "ééé", "é"]);
    }

    #[test]
    fn split_keeps_document_order_and_labels() {
        let c = chunker(5, 0);
        let docs = vec![
            Document::new("aaaaabbbbb", "one.txt"),
            Document::new("", "empty.txt"),
            Document::new("ccc", "deck.pdf").with_page(2),
        ];
        let chunks = c.split(&docs);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].source, "one.txt");
        assert_eq!((chunks[1].index, chunks[1].offset), (1, 5));
        assert_eq!(chunks[2].source, "deck.pdf");
        assert_eq!(chunks[2].page, Some(2));
        assert_eq!(chunks[2].index, 0);
    }
}
