use std::path::Path;

use corpus_index::{
    codec::{
        basic::POSTINGS_EXT,
        BasicPostingsFormat, Codec, CodecConfig, PostingsFormatRegistry, SegmentFiles,
        SegmentInfo, SegmentWriteState, CODEC_INFO_EXT,
    },
    collation::{CollatorConfig, CollatorVersion},
    error::Error,
    forward::FIELDS_EXT,
    postings::{FieldTerms, Fields, Posting},
};
use helpers::corpus::{TestCorpus, LEMMA_FIELD, TITLE_FIELD, WORD_FIELD};
use rstest::rstest;
use temp_dir::TempDir;

/// Initialize the logger
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn postings(field: &dyn FieldTerms) -> Vec<(String, Vec<Posting>)> {
    field
        .terms()
        .map(|term| {
            let term = term.unwrap();
            (term.term, term.postings.map(|p| p.unwrap()).collect())
        })
        .collect()
}

fn overwrite(path: &Path, offset: usize, bytes: &[u8]) {
    let mut data = std::fs::read(path).unwrap();
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
    std::fs::write(path, data).unwrap();
}

#[test]
fn test_no_postings_format() {
    let codec = Codec::with_registry(CodecConfig::default(), PostingsFormatRegistry::new());
    assert!(matches!(codec.postings_format(), Err(Error::CodecUnavailable(_))));

    let config = CodecConfig {
        delegate_postings_format: Some("lucene99".to_string()),
        default_postings_format: "lucene90".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        Codec::new(config).postings_format(),
        Err(Error::CodecUnavailable(_))
    ));
}

#[test]
fn test_unavailable_codec_writes_nothing() {
    let corpus = TestCorpus::new(20, 5, 5., Some(2));
    let config = CodecConfig {
        default_postings_format: "unknown".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        corpus.write_segment("_0", &config),
        Err(Error::CodecUnavailable(_))
    ));
    assert_eq!(std::fs::read_dir(corpus.dir.path()).unwrap().count(), 0);
}

#[rstest]
#[case(None)]
#[case(Some("basic"))]
#[case(Some("not-registered"))]
fn test_delegate_resolution(#[case] delegate: Option<&str>) {
    let config = CodecConfig {
        delegate_postings_format: delegate.map(|s| s.to_string()),
        ..Default::default()
    };
    let registry = PostingsFormatRegistry::default();
    assert_eq!(registry.resolve(&config).unwrap().name(), "basic");

    let codec = Codec::new(config);
    assert_eq!(codec.postings_format().unwrap().name(), "forward-index");
}

#[test]
fn test_custom_registry() {
    let mut registry = PostingsFormatRegistry::new();
    registry.register(Box::new(BasicPostingsFormat::default()));
    assert_eq!(registry.names(), vec!["basic"]);

    let mut codec = Codec::with_registry(
        CodecConfig {
            forward_index: false,
            ..Default::default()
        },
        registry,
    );
    assert_eq!(codec.postings_format().unwrap().name(), "basic");

    codec.registry_mut().register(Box::new(BasicPostingsFormat::default()));
    assert_eq!(codec.config().default_postings_format, "basic");
}

#[rstest]
#[case(true)]
#[case(false)]
fn test_postings_read_back(#[case] forward_index: bool) {
    init_logger();
    let corpus = TestCorpus::new(100, 50, 10., Some(4));
    let config = CodecConfig {
        forward_index,
        ..Default::default()
    };
    let files = corpus.write_segment("_0", &config).unwrap();

    let segment = Codec::new(config).open_segment(&files).unwrap();
    assert_eq!(segment.max_doc(), corpus.max_doc());
    assert_eq!(segment.names(), corpus.fields.names());

    for field in [WORD_FIELD, LEMMA_FIELD, TITLE_FIELD] {
        let expected = corpus.fields.terms(field).unwrap();
        let observed = segment.terms(field).unwrap();
        assert_eq!(observed.size(), expected.size());
        assert_eq!(observed.has_positions(), expected.has_positions());
        assert_eq!(postings(observed), postings(expected));
    }

    assert_eq!(segment.forward_index().is_some(), forward_index);
    assert_eq!(files.path(FIELDS_EXT).exists(), forward_index);
    if !forward_index {
        assert_eq!(segment.postings_format(), "basic");
        assert!(segment
            .field_infos()
            .iter()
            .all(|info| info.attributes.is_empty()));
    }
}

#[test]
fn test_segment_suffix() {
    let corpus = TestCorpus::new(50, 10, 5., Some(8));
    let files = corpus.segment_files("_3").with_suffix("fi_0");
    let mut state =
        SegmentWriteState::new(files.clone(), corpus.max_doc(), corpus.fields.field_infos());
    let codec = Codec::new(CodecConfig::default());
    codec.write_segment(&mut state, &corpus.fields).unwrap();

    assert!(corpus.dir.path().join("_3_fi_0.fwdtokens").exists());
    assert!(corpus.dir.path().join("_3_fi_0.codec.cbor").exists());

    let info = SegmentInfo::load(&files).unwrap();
    assert_eq!(info.max_doc, corpus.max_doc());
    assert_eq!(info.postings_format.name(), "forward-index");
    assert!(codec.open_segment(&files).unwrap().forward_index().is_some());
}

#[test]
fn test_missing_segment_info() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let files = SegmentFiles::new(dir.path(), "_0");
    assert!(!files.path(CODEC_INFO_EXT).exists());
    assert!(matches!(
        Codec::new(CodecConfig::default()).open_segment(&files),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_reopen_with_another_collator() {
    let corpus = TestCorpus::new(50, 10, 5., Some(9));
    let files = corpus.write_segment("_0", &CodecConfig::default()).unwrap();

    let config = CodecConfig {
        collator: CollatorConfig::new("en-GB", CollatorVersion::V1),
        ..Default::default()
    };
    assert!(matches!(
        Codec::new(config).open_segment(&files),
        Err(Error::CollatorMismatch { .. })
    ));
}

#[test]
fn test_config_file() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let path = dir.path().join("codec-config.cbor");

    let config = CodecConfig {
        delegate_postings_format: Some("basic".to_string()),
        terms_block_size: 10,
        in_memory: true,
        collator: CollatorConfig::new("nl-NL", CollatorVersion::V1),
        ..Default::default()
    };
    config.save(&path).unwrap();

    let loaded = CodecConfig::load(&path).unwrap();
    assert_eq!(loaded.delegate_postings_format.as_deref(), Some("basic"));
    assert_eq!(loaded.terms_block_size, 10);
    assert!(loaded.in_memory);
    assert!(loaded.use_blocks);
    assert!(loaded.forward_index);
    assert_eq!(loaded.collator, config.collator);
}

#[test]
fn test_corrupt_field_count() {
    let corpus = TestCorpus::new(50, 10, 5., Some(11));
    let config = CodecConfig::default();
    let files = corpus.write_segment("_0", &config).unwrap();

    overwrite(&files.path(FIELDS_EXT), 0, &[0xFF; 4]);
    assert!(matches!(
        Codec::new(config).open_segment(&files),
        Err(Error::Format { .. })
    ));
}

#[test]
fn test_corrupt_posting_frequency() {
    let corpus = TestCorpus::new(50, 10, 5., Some(12));
    let config = CodecConfig {
        forward_index: false,
        ..Default::default()
    };
    let files = corpus.write_segment("_0", &config).unwrap();

    // Frequency of the first posting of the first field (lemma, with positions)
    overwrite(&files.path(POSTINGS_EXT), 4, &[0xFF; 4]);
    let segment = Codec::new(config).open_segment(&files).unwrap();
    let mut terms = segment.terms(LEMMA_FIELD).unwrap().terms();
    let mut postings = terms.next().unwrap().unwrap().postings;
    assert!(matches!(postings.next(), Some(Err(Error::Format { .. }))));
    assert!(postings.next().is_none());
}
