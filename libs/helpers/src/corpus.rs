use log::info;
use rand::{rngs::StdRng, SeedableRng};
use temp_dir::TempDir;

use crate::documents::{create_document, create_vocabulary, TestDocument};
use corpus_index::{
    base::DocId,
    codec::{Codec, CodecConfig, SegmentFiles, SegmentWriteState},
    error::Result,
    forward::SegmentForwardIndex,
    postings::{IndexOptions, MemoryFields},
};

pub const WORD_FIELD: &str = "word";
pub const LEMMA_FIELD: &str = "lemma";
pub const TITLE_FIELD: &str = "title";

/// Random documents together with their in-memory postings
pub struct TestCorpus {
    pub dir: TempDir,
    pub vocabulary: Vec<String>,
    pub documents: Vec<TestDocument>,
    pub fields: MemoryFields,
}

impl TestCorpus {
    pub fn new(
        vocabulary_size: usize,
        document_count: DocId,
        lambda_words: f64,
        seed: Option<u64>,
    ) -> Self {
        let dir = TempDir::new().expect("Could not create temporary directory");
        let mut rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        let vocabulary = create_vocabulary(vocabulary_size, &mut rng);
        let mut fields = MemoryFields::new();
        fields.add_field(WORD_FIELD, IndexOptions::DocsFreqsAndPositions);
        fields.add_field(LEMMA_FIELD, IndexOptions::DocsFreqsAndPositions);
        fields.add_field(TITLE_FIELD, IndexOptions::Docs);

        let mut documents = Vec::new();
        for doc_id in 0..document_count {
            let document = create_document(lambda_words, &vocabulary, &mut rng);
            fields.add_document(doc_id, WORD_FIELD, &document.words);
            fields.add_document(doc_id, LEMMA_FIELD, &document.lemmas);
            fields.add_document(doc_id, TITLE_FIELD, &document.title);
            documents.push(document);
        }

        info!(
            "Created a corpus of {} documents ({} words)",
            documents.len(),
            documents.iter().map(|d| d.words.len()).sum::<usize>()
        );

        Self {
            dir,
            vocabulary,
            documents,
            fields,
        }
    }

    pub fn max_doc(&self) -> DocId {
        self.documents.len() as DocId
    }

    pub fn segment_files(&self, name: &str) -> SegmentFiles {
        SegmentFiles::new(self.dir.path(), name)
    }

    /// Writes the corpus as one segment
    pub fn write_segment(&self, name: &str, config: &CodecConfig) -> Result<SegmentFiles> {
        let files = self.segment_files(name);
        let mut state =
            SegmentWriteState::new(files.clone(), self.max_doc(), self.fields.field_infos());
        Codec::new(config.clone()).write_segment(&mut state, &self.fields)?;
        Ok(files)
    }

    /// The tokens of a document field
    pub fn tokens(&self, field: &str, doc_id: DocId) -> &[String] {
        let document = &self.documents[doc_id as usize];
        match field {
            WORD_FIELD => &document.words,
            LEMMA_FIELD => &document.lemmas,
            TITLE_FIELD => &document.title,
            _ => panic!("Unknown field {}", field),
        }
    }
}

/// Checks that the forward index gives back the tokens of each document
pub fn check_forward_index(corpus: &TestCorpus, index: &SegmentForwardIndex) {
    for field in [WORD_FIELD, LEMMA_FIELD] {
        for doc_id in 0..corpus.max_doc() {
            let expected = corpus.tokens(field, doc_id);
            let observed: Vec<String> = index
                .tokens(field, doc_id)
                .expect("Could not read the tokens")
                .into_iter()
                .map(|id| index.term_string(field, id).expect("Unknown term id"))
                .collect();
            assert_eq!(
                observed, expected,
                "Tokens differ for field {}, document {}",
                field, doc_id
            );
        }
    }
    assert!(!index.has_field(TITLE_FIELD));
}
