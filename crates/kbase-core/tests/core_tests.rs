use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use kbase_core::config::{Config, EmbeddingProvider, IndexBackend, Settings};
use kbase_core::loader::load_documents;
use kbase_core::{Chunker, ChunkingConfig, Document, Error, IngestErrorKind};

fn write_pdf(path: &Path, pages: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn load_plain_text_as_single_document() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("playbook.txt");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "Always ask about budget early.").unwrap();

    let docs = load_documents(&path, "playbook.txt").expect("load");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source, "playbook.txt");
    assert_eq!(docs[0].page, None);
    assert_eq!(docs[0].text.trim(), "Always ask about budget early.");
}

#[test]
fn load_pdf_one_document_per_page() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("deck.pdf");
    write_pdf(&path, &["Pricing starts low", "Support is included"]);

    let docs = load_documents(&path, "deck.pdf").expect("load pdf");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].page, Some(1));
    assert_eq!(docs[1].page, Some(2));
    assert!(docs[0].text.contains("Pricing"), "page 1 text: {:?}", docs[0].text);
    assert!(docs[1].text.contains("Support"), "page 2 text: {:?}", docs[1].text);
    assert!(docs.iter().all(|d| d.source == "deck.pdf"));
}

#[test]
fn unreadable_inputs_fail_without_partial_result() {
    let tmp = TempDir::new().unwrap();

    let missing = tmp.path().join("nope.txt");
    let err = load_documents(&missing, "nope.txt").unwrap_err();
    assert_eq!(err.ingest_kind(), Some(IngestErrorKind::UnreadableFile));

    let binary = tmp.path().join("blob.txt");
    fs::write(&binary, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
    let err = load_documents(&binary, "blob.txt").unwrap_err();
    assert_eq!(err.ingest_kind(), Some(IngestErrorKind::UnreadableFile));

    let fake_pdf = tmp.path().join("fake.pdf");
    fs::write(&fake_pdf, "this is not a pdf").unwrap();
    let err = load_documents(&fake_pdf, "fake.pdf").unwrap_err();
    assert_eq!(err.ingest_kind(), Some(IngestErrorKind::UnreadableFile));
}

#[test]
fn chunk_count_and_reconstruction_hold_across_lengths() {
    for (max, overlap) in [(10usize, 0usize), (10, 3), (7, 6), (1000, 200)] {
        let chunker = Chunker::new(ChunkingConfig::new(max, overlap).unwrap()).unwrap();
        let stride = max - overlap;
        for len in [1usize, 2, max - 1, max, max + 1, 2 * max, 3 * max + 5, 2500] {
            let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
            let chunks = chunker.split(&[Document::new(text.clone(), "t.txt")]);

            let expected = if len <= max { 1 } else { len.div_ceil(stride) };
            assert_eq!(chunks.len(), expected, "len={len} max={max} overlap={overlap}");
            assert!(chunks.iter().all(|c| c.char_len() <= max));

            // stride regions (plus the tail of the last chunk) rebuild the text
            let mut rebuilt = String::new();
            for (i, c) in chunks.iter().enumerate() {
                if i + 1 == chunks.len() {
                    rebuilt.push_str(&c.text);
                } else {
                    rebuilt.extend(c.text.chars().take(stride));
                }
            }
            assert_eq!(rebuilt, text);
        }
    }
}

#[test]
fn twenty_five_hundred_chars_make_four_chunks() {
    let chunker = Chunker::new(ChunkingConfig::new(1000, 200).unwrap()).unwrap();
    let text = "x".repeat(2500);
    let chunks = chunker.split(&[Document::new(text, "big.txt")]);
    let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
    assert_eq!(offsets, vec![0, 800, 1600, 2400]);
    assert_eq!(chunks[3].char_len(), 100);
}

#[test]
fn settings_layering_and_validation() {
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
        r#"
        default_namespace = "playbooks"
        [chunking]
        max_chars = 500
        [embedding]
        provider = "hash"
        dim = 64
        [index]
        backend = "memory"
        "#,
    ));
    let settings = Config::from_figment(figment).settings().expect("settings");
    assert_eq!(settings.default_namespace, "playbooks");
    assert_eq!(settings.chunking.max_chars, 500);
    assert_eq!(settings.chunking.overlap, 200);
    assert_eq!(settings.embedding.provider, EmbeddingProvider::Hash);
    assert_eq!(settings.index.backend, IndexBackend::Memory);
    assert!(settings.index.uri.is_none());

    let bad = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::string("[chunking]\nmax_chars = 100\noverlap = 100\n"));
    assert!(matches!(Config::from_figment(bad).settings(), Err(Error::Config(_))));

    let bad_ns = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string("default_namespace = \"  \"\n"));
    assert!(matches!(Config::from_figment(bad_ns).settings(), Err(Error::Config(_))));
}

#[test]
fn malformed_settings_are_config_errors() {
    let wrong_type = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::string("[chunking]\nmax_chars = \"lots\"\n"));
    assert!(matches!(Config::from_figment(wrong_type).settings(), Err(Error::Config(_))));

    let settings = Settings { default_namespace: "has space".to_string(), ..Settings::default() };
    assert!(matches!(settings.default_namespace(), Err(Error::Config(_))));
    assert_eq!(Settings::default().default_namespace().unwrap().as_str(), "Sample");
}
