//! Helpers shared by the `kbase` binary.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const INGESTIBLE: &[&str] = &["pdf", "txt", "md"];

/// Files to ingest for `path`: the file itself, or every `.pdf`, `.txt` and
/// `.md` file below a directory in a stable order. Hidden entries are skipped.
/// A path that does not exist is passed through so ingesting it reports an
/// unreadable file.
pub fn collect_inputs(path: &Path) -> Vec<PathBuf> {
    if path.is_file() || !path.exists() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| INGESTIBLE.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        })
        .collect();
    files.sort();
    files
}

/// One line of ingest progress output for `file`.
pub fn file_report(file: &Path, chunks: usize) -> String {
    let unit = if chunks == 1 { "chunk" } else { "chunks" };
    format!("{} -> {chunks} {unit}", file.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn walks_directories_for_known_formats() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();
        fs::write(tmp.path().join("nested/a.PDF"), "a").unwrap();
        fs::write(tmp.path().join("notes.md"), "n").unwrap();
        fs::write(tmp.path().join("image.png"), "x").unwrap();
        fs::write(tmp.path().join(".git/config.txt"), "x").unwrap();

        let found: Vec<String> = collect_inputs(tmp.path())
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["b.txt", "nested/a.PDF", "notes.md"]);
    }

    #[test]
    fn single_file_is_taken_as_is() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("deck.bin");
        fs::write(&file, "x").unwrap();
        assert_eq!(collect_inputs(&file), vec![file]);
    }

    #[test]
    fn file_report_names_file_and_count() {
        assert_eq!(file_report(Path::new("docs/deck.pdf"), 4), "docs/deck.pdf -> 4 chunks");
        assert_eq!(file_report(Path::new("a.txt"), 1), "a.txt -> 1 chunk");
    }

    #[test]
    fn missing_path_is_passed_through() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone.pdf");
        assert_eq!(collect_inputs(&missing), vec![missing]);
    }
}
