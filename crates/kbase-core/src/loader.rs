//! Turns a file on disk into [`Document`]s.
//!
//! The extension picks the parser: `.pdf` is read page by page, anything else
//! is read whole as UTF-8 text. Loading never touches the index and never
//! returns a partial result.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Self::Pdf,
            _ => Self::Text,
        }
    }
}

/// Default source label for a path: its file name.
pub fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn load_documents(path: &Path, source: &str) -> Result<Vec<Document>> {
    let docs = match DocumentFormat::from_path(path) {
        DocumentFormat::Pdf => load_pdf(path, source)?,
        DocumentFormat::Text => vec![load_text(path, source)?],
    };
    debug!(path = %path.display(), source, documents = docs.len(), "loaded document");
    Ok(docs)
}

fn load_text(path: &Path, source: &str) -> Result<Document> {
    let bytes = fs::read(path).map_err(|e| Error::unreadable(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| Error::unreadable(path, format!("not valid UTF-8: {e}")))?;
    Ok(Document::new(text, source))
}

fn load_pdf(path: &Path, source: &str) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path).map_err(|e| Error::unreadable(path, e))?;
    let pages = pdf.get_pages();
    if pages.is_empty() {
        return Err(Error::unreadable(path, "PDF has no pages"));
    }
    pages
        .keys()
        .map(|&page| {
            let text = pdf
                .extract_text(&[page])
                .map_err(|e| Error::unreadable(path, format!("page {page}: {e}")))?;
            Ok(Document::new(text, source).with_page(page))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("deck.pdf")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("DECK.PDF")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("notes.txt")), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), DocumentFormat::Text);
    }

    #[test]
    fn source_label_is_file_name() {
        assert_eq!(source_label(&PathBuf::from("/tmp/x/playbook.txt")), "playbook.txt");
    }
}
