use std::{fs, path::Path};

use corpus_index::{
    codec::{Codec, CodecConfig, SegmentFiles, SegmentWriteState},
    error::Error,
    forward::{dictionary_ext, FORWARD_INDEX_ATTRIBUTE},
    postings::{IndexOptions, MemoryFields},
};
use helpers::corpus::{check_forward_index, TestCorpus, LEMMA_FIELD, WORD_FIELD};
use log::info;
use rstest::rstest;
use temp_dir::TempDir;

/// Initialize the logger
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Three documents, the second one without words
fn small_corpus() -> MemoryFields {
    let mut fields = MemoryFields::new();
    fields.add_field("title", IndexOptions::Docs);
    fields.add_document(0, "word", &["the", "quick", "brown", "fox"]);
    fields.add_document(0, "title", &["fox"]);
    fields.add_document(1, "title", &["empty"]);
    fields.add_document(2, "word", &["the", "lazy", "dog", "the", "end"]);
    fields
}

fn write(
    dir: &Path,
    name: &str,
    fields: &MemoryFields,
    config: &CodecConfig,
) -> corpus_index::error::Result<SegmentFiles> {
    let files = SegmentFiles::new(dir, name);
    let mut state = SegmentWriteState::new(files.clone(), fields.max_doc(), fields.field_infos());
    Codec::new(config.clone()).write_segment(&mut state, fields)?;
    Ok(files)
}

/// Names of the forward index files (and segment information) in a directory
fn forward_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.contains(".fwd") || name.ends_with(".codec.cbor"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_small_corpus() {
    init_logger();
    let dir = TempDir::new().expect("Could not create temporary directory");
    let fields = small_corpus();
    let config = CodecConfig::default();
    let files = write(dir.path(), "_0", &fields, &config).unwrap();

    let codec = Codec::new(config);
    let segment = codec.open_segment(&files).unwrap();
    assert_eq!(segment.max_doc(), 3);
    assert_eq!(segment.postings_format(), "forward-index");

    let index = segment.forward_index().expect("No forward index");
    let names: Vec<&str> = index.fields().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["word"]);

    let entry = index.field("word").unwrap();
    assert_eq!(entry.term_count, 7);
    assert_eq!(entry.doc_count, 3);

    let strings = |doc_id| -> Vec<String> {
        index
            .tokens("word", doc_id)
            .unwrap()
            .into_iter()
            .map(|id| index.term_string("word", id).unwrap())
            .collect()
    };
    assert_eq!(strings(0), vec!["the", "quick", "brown", "fox"]);
    assert!(strings(1).is_empty());
    assert_eq!(strings(2), vec!["the", "lazy", "dog", "the", "end"]);

    assert_eq!(index.doc_length("word", 0).unwrap(), 4);
    assert_eq!(index.doc_length("word", 1).unwrap(), 0);

    let lazy = index.resolve_term_id("word", "lazy").unwrap().unwrap();
    let dog = index.resolve_term_id("word", "dog").unwrap().unwrap();
    assert_eq!(index.tokens_in_range("word", 2, 1, 3).unwrap(), vec![lazy, dog]);
    assert!(index.tokens_in_range("word", 2, 5, 5).unwrap().is_empty());
    assert_eq!(index.resolve_term_id("word", "cat").unwrap(), None);

    // Terms in host order are numbered in the same order
    assert_eq!(index.term_at_ordinal("word", 0).unwrap(), "brown");
    assert_eq!(index.term_at_ordinal("word", 6).unwrap(), "the");
    for id in 0..7 {
        assert_eq!(
            index.term_at_ordinal("word", id as u64).unwrap(),
            index.term_string("word", id).unwrap()
        );
        // All lower-case and already sorted
        assert_eq!(index.sort_position("word", id, true).unwrap(), id);
        assert_eq!(index.id_at_sort_position("word", id, false).unwrap(), id);
    }

    let infos = segment.field_infos();
    assert_eq!(infos.get("word").unwrap().attribute(FORWARD_INDEX_ATTRIBUTE), Some("1"));
    assert_eq!(infos.get("title").unwrap().attribute(FORWARD_INDEX_ATTRIBUTE), None);
    assert!(!files.path(&dictionary_ext(infos.get("title").unwrap().number)).exists());
    assert!(!files.path("fwdtermvec.tmp").exists());
}

#[test]
fn test_read_errors() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let fields = small_corpus();
    let config = CodecConfig::default();
    let files = write(dir.path(), "_0", &fields, &config).unwrap();
    let segment = Codec::new(config).open_segment(&files).unwrap();
    let index = segment.forward_index().unwrap();

    let err = index.tokens_in_range("word", 0, 2, 5).unwrap_err();
    assert!(matches!(err, Error::OutOfRange { .. }));
    assert_eq!(
        err.to_string(),
        "position 5 out of range (limit 4) in segment _0, field word, document 0"
    );
    assert!(matches!(
        index.tokens_in_range("word", 0, 3, 2),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(index.tokens("word", 3), Err(Error::OutOfRange { .. })));
    assert!(matches!(index.term_string("word", 7), Err(Error::OutOfRange { .. })));
    assert!(matches!(index.term_at_ordinal("word", 7), Err(Error::OutOfRange { .. })));
    assert!(matches!(
        index.sort_position("word", 100, true),
        Err(Error::OutOfRange { .. })
    ));

    match index.tokens("title", 0) {
        Err(Error::UnknownField { segment, field }) => {
            assert_eq!(segment, "_0");
            assert_eq!(field, "title");
        }
        _ => panic!("Expected an unknown field error"),
    }
}

#[test]
fn test_builds_are_identical() {
    init_logger();
    let corpus = TestCorpus::new(200, 100, 15., Some(3));
    let config = CodecConfig::default();
    let first = corpus.write_segment("_0", &config).unwrap();
    let second = corpus.write_segment("_1", &config).unwrap();

    let segment = Codec::new(config).open_segment(&first).unwrap();
    let mut exts: Vec<String> = ["fwdfields", "fwdtermindex", "fwdterms", "fwddocs", "fwdtokens"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for entry in segment.forward_index().unwrap().fields() {
        exts.push(dictionary_ext(entry.number));
    }
    assert_eq!(exts.len(), 7);

    for ext in exts {
        let a = fs::read(first.path(&ext)).unwrap();
        let b = fs::read(second.path(&ext)).unwrap();
        assert!(a == b, "File {} differs between the two builds", ext);
    }
}

#[test]
fn test_overlapping_positions() {
    init_logger();
    let dir = TempDir::new().expect("Could not create temporary directory");
    let mut fields = MemoryFields::new();
    fields.add_occurrence("word", "a", 0, 0);
    fields.add_occurrence("word", "b", 0, 1);
    fields.add_occurrence("word", "c", 0, 1);

    match write(dir.path(), "_0", &fields, &CodecConfig::default()) {
        Err(Error::CorruptForwardIndex { field, doc_id, .. }) => {
            assert_eq!(field, "word");
            assert_eq!(doc_id, Some(0));
        }
        Err(e) => panic!("Unexpected error {}", e),
        Ok(_) => panic!("Overlapping positions were accepted"),
    }
    assert!(forward_files(dir.path()).is_empty());
}

#[test]
fn test_position_gap() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let mut fields = MemoryFields::new();
    fields.add_document(0, "word", &["a", "b"]);
    fields.add_occurrence("word", "a", 1, 0);
    fields.add_occurrence("word", "b", 1, 2);

    let err = write(dir.path(), "_0", &fields, &CodecConfig::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Corrupt forward index for field word, document 1: no term at position 1"
    );
    assert!(forward_files(dir.path()).is_empty());
}

#[test]
fn test_document_beyond_segment() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let fields = small_corpus();

    let files = SegmentFiles::new(dir.path(), "_0");
    let mut state = SegmentWriteState::new(files, 2, fields.field_infos());
    let result = Codec::new(CodecConfig::default()).write_segment(&mut state, &fields);

    assert!(matches!(
        result,
        Err(Error::CorruptForwardIndex {
            doc_id: Some(2),
            ..
        })
    ));
    assert!(forward_files(dir.path()).is_empty());
    assert!(state.field_infos.get("word").unwrap().attributes.is_empty());
}

#[test]
fn test_empty_segment() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let mut fields = MemoryFields::new();
    fields.add_field("word", IndexOptions::DocsFreqsAndPositions);

    let config = CodecConfig::default();
    let files = write(dir.path(), "_0", &fields, &config).unwrap();
    let segment = Codec::new(config).open_segment(&files).unwrap();
    let index = segment.forward_index().unwrap();

    let entry = index.field("word").unwrap();
    assert_eq!((entry.term_count, entry.doc_count), (0, 0));
    assert!(index.tokens("word", 0).is_err());
}

#[rstest]
fn test_random_corpus(
    #[values(true, false)] in_memory: bool,
    #[values(true, false)] use_blocks: bool,
) {
    init_logger();
    let corpus = TestCorpus::new(300, 200, 20., Some(1));
    let config = CodecConfig {
        terms_block_size: 10,
        in_memory,
        use_blocks,
        ..Default::default()
    };
    let files = corpus.write_segment("_0", &config).unwrap();

    let segment = Codec::new(config).open_segment(&files).unwrap();
    let index = segment.forward_index().unwrap();
    info!(
        "{} terms in field {}",
        index.term_count(WORD_FIELD).unwrap(),
        WORD_FIELD
    );
    check_forward_index(&corpus, index);

    // Lemmas are lower-cased words: their dictionary is never larger
    assert!(index.term_count(LEMMA_FIELD).unwrap() <= index.term_count(WORD_FIELD).unwrap());
}
