//! Default persistence of the postings
//!
//! The postings of all the fields are written in one binary file; for each
//! posting of a term: the document ID, the frequency and (if the field has
//! positions) the positions, all as big-endian u32. The term strings and the
//! offset of their postings are kept in a CBOR metadata file.

use std::{fs::File, io::BufWriter, sync::Arc};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    config::CodecConfig,
    segment::{SegmentFiles, SegmentReadState, SegmentWriteState},
    FieldsConsumer, FieldsProducer, PostingsFormat,
};
use crate::{
    error::{Error, Result},
    postings::{FieldInfos, FieldTerms, Fields, IndexOptions, Posting, TermPostings},
    utils::{
        buffer::{open_buffer, Buffer},
        output::{FileGuard, TrackedWriter},
    },
};

pub const POSTINGS_EXT: &str = "postings";
pub const POSTINGS_META_EXT: &str = "postings.cbor";

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct BasicPostingsFormat {}

#[typetag::serde]
impl PostingsFormat for BasicPostingsFormat {
    fn name(&self) -> &str {
        "basic"
    }

    fn fields_consumer(
        &self,
        state: &SegmentWriteState,
        _config: &CodecConfig,
    ) -> Result<Box<dyn FieldsConsumer>> {
        Ok(Box::new(BasicFieldsConsumer {
            files: state.files.clone(),
        }))
    }

    fn fields_producer(
        &self,
        state: &SegmentReadState,
        config: &CodecConfig,
    ) -> Result<Box<dyn FieldsProducer>> {
        Ok(Box::new(BasicFieldsProducer::open(&state.files, config)?))
    }

    fn clone_boxed(&self) -> Box<dyn PostingsFormat> {
        Box::new(self.clone())
    }
}

#[derive(Serialize, Deserialize)]
struct TermInformation {
    term: String,
    /// Offset of the first posting
    offset: u64,
    doc_count: u32,
}

#[derive(Serialize, Deserialize)]
struct FieldInformation {
    name: String,
    index_options: IndexOptions,
    terms: Vec<TermInformation>,
}

#[derive(Serialize, Deserialize)]
struct PostingsInformation {
    fields: Vec<FieldInformation>,
}

// ---- Writing

struct BasicFieldsConsumer {
    files: SegmentFiles,
}

impl FieldsConsumer for BasicFieldsConsumer {
    fn write(&mut self, fields: &dyn Fields, _field_infos: &mut FieldInfos) -> Result<()> {
        let mut guard = FileGuard::new();
        let mut out = TrackedWriter::new(guard.create(&self.files.path(POSTINGS_EXT))?);
        let mut information = PostingsInformation { fields: Vec::new() };

        for name in fields.names() {
            let field = match fields.terms(&name) {
                Some(field) => field,
                None => continue,
            };
            let index_options = if field.has_positions() {
                IndexOptions::DocsFreqsAndPositions
            } else if field.has_freqs() {
                IndexOptions::DocsAndFreqs
            } else {
                IndexOptions::Docs
            };

            let mut terms = Vec::with_capacity(field.size());
            for term in field.terms() {
                let term = term?;
                let offset = out.position();
                let mut doc_count = 0;
                for posting in term.postings {
                    let posting = posting?;
                    out.write_u32(posting.doc_id)?;
                    out.write_u32(posting.freq)?;
                    if index_options.has_positions() {
                        for position in posting.positions.iter() {
                            out.write_u32(*position)?;
                        }
                    }
                    doc_count += 1;
                }
                terms.push(TermInformation {
                    term: term.term,
                    offset,
                    doc_count,
                });
            }

            debug!("Wrote the postings of {} terms for field {}", terms.len(), name);
            information.fields.push(FieldInformation {
                name,
                index_options,
                terms,
            });
        }
        out.finish()?;

        let mut meta = BufWriter::new(guard.create(&self.files.path(POSTINGS_META_EXT))?);
        ciborium::ser::into_writer(&information, &mut meta)?;
        meta.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        guard.commit();
        Ok(())
    }
}

// ---- Reading

struct BasicFieldTerms {
    information: FieldInformation,
    buffer: Arc<dyn Buffer>,
    path: Arc<String>,
}

impl FieldTerms for BasicFieldTerms {
    fn has_freqs(&self) -> bool {
        self.information.index_options.has_freqs()
    }

    fn has_positions(&self) -> bool {
        self.information.index_options.has_positions()
    }

    fn size(&self) -> usize {
        self.information.terms.len()
    }

    fn terms<'a>(&'a self) -> Box<dyn Iterator<Item = Result<TermPostings<'a>>> + 'a> {
        let with_positions = self.has_positions();
        Box::new(self.information.terms.iter().map(move |term| {
            Ok(TermPostings {
                term: term.term.clone(),
                postings: Box::new(PostingsIterator {
                    buffer: self.buffer.as_ref(),
                    path: self.path.as_str(),
                    offset: term.offset as usize,
                    remaining: term.doc_count,
                    with_positions,
                }),
            })
        }))
    }
}

struct PostingsIterator<'a> {
    buffer: &'a dyn Buffer,
    path: &'a str,
    offset: usize,
    remaining: u32,
    with_positions: bool,
}

impl<'a> PostingsIterator<'a> {
    fn read(&mut self) -> std::io::Result<Posting> {
        let doc_id = self.buffer.u32_at(self.offset)?;
        let freq = self.buffer.u32_at(self.offset + 4)?;
        self.offset += 8;

        let mut positions = Vec::new();
        if self.with_positions {
            let available = self.buffer.len().saturating_sub(self.offset) / 4;
            if freq as usize > available {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "document {} has {} positions, {} left in the file",
                        doc_id, freq, available
                    ),
                ));
            }
            positions.reserve(freq as usize);
            for _ in 0..freq {
                positions.push(self.buffer.u32_at(self.offset)?);
                self.offset += 4;
            }
        }

        Ok(Posting {
            doc_id,
            freq,
            positions,
        })
    }
}

impl<'a> Iterator for PostingsIterator<'a> {
    type Item = Result<Posting>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.read() {
            Ok(posting) => Some(Ok(posting)),
            Err(e) => {
                self.remaining = 0;
                Some(Err(Error::format(self.path, e)))
            }
        }
    }
}

struct BasicFieldsProducer {
    fields: Vec<BasicFieldTerms>,
}

impl BasicFieldsProducer {
    fn open(files: &SegmentFiles, config: &CodecConfig) -> Result<Self> {
        let meta = File::open(files.path(POSTINGS_META_EXT))?;
        let information: PostingsInformation =
            ciborium::de::from_reader(std::io::BufReader::new(meta))?;

        let buffer: Arc<dyn Buffer> =
            Arc::from(open_buffer(&files.path(POSTINGS_EXT), config.in_memory)?);
        let path = Arc::new(files.path(POSTINGS_EXT).display().to_string());

        Ok(Self {
            fields: information
                .fields
                .into_iter()
                .map(|information| BasicFieldTerms {
                    information,
                    buffer: buffer.clone(),
                    path: path.clone(),
                })
                .collect(),
        })
    }
}

impl Fields for BasicFieldsProducer {
    fn names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.information.name.clone())
            .collect()
    }

    fn terms(&self, field: &str) -> Option<&dyn FieldTerms> {
        self.fields
            .iter()
            .find(|f| f.information.name == field)
            .map(|f| f as &dyn FieldTerms)
    }
}

impl FieldsProducer for BasicFieldsProducer {}
