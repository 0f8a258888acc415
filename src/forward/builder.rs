//! Builds the forward index of a segment from its postings.
//!
//! The postings are term-major (term -> document -> positions) while the
//! forward index is document-major. Each field is processed in two phases:
//!
//! 1. scan: the terms are registered in the field dictionary, their strings
//!    written to the term store, and each posting appended to a temporary
//!    term-major store where records of the same document are chained;
//! 2. reversal: for each document, the chain is read back and the positions
//!    of all its terms are merged into the array of term ids.
//!
//! Memory stays bounded by the number of documents (chain heads) and the
//! length of the largest document.

use std::{
    fs,
    io::{BufWriter, Write},
};

use log::{debug, info};

use super::{
    dictionary_ext,
    termvec::{read_document, TermVectorWriter},
    FieldDirectoryEntry, DOCS_EXT, FIELDS_EXT, TERMS_EXT, TERMVEC_TMP_EXT, TERM_INDEX_EXT,
    TOKENS_EXT,
};
use crate::{
    base::{DocId, Position, TermId},
    codec::{config::CodecConfig, segment::SegmentFiles},
    collation::Collators,
    error::{Error, Result},
    postings::{FieldTerms, Posting},
    terms::{Terms, TermsWriter},
    utils::{
        buffer::open_buffer,
        output::{FileGuard, TrackedWriter},
    },
};

/// Writes the forward index companion files of one segment
///
/// Files are removed if the writer is dropped before [`ForwardIndexWriter::finish`].
pub struct ForwardIndexWriter {
    files: SegmentFiles,
    max_doc: DocId,
    collators: Collators,
    terms_block_size: usize,
    in_memory: bool,

    entries: Vec<FieldDirectoryEntry>,

    term_index: TrackedWriter,
    terms: TrackedWriter,
    docs: TrackedWriter,
    tokens: TrackedWriter,

    // Dropped last, once all the files are closed
    guard: FileGuard,
}

impl ForwardIndexWriter {
    pub fn create(files: &SegmentFiles, max_doc: DocId, config: &CodecConfig) -> Result<Self> {
        let collators = Collators::new(config.collator.clone())?;
        let mut guard = FileGuard::new();
        let term_index = TrackedWriter::new(guard.create(&files.path(TERM_INDEX_EXT))?);
        let terms = TrackedWriter::new(guard.create(&files.path(TERMS_EXT))?);
        let docs = TrackedWriter::new(guard.create(&files.path(DOCS_EXT))?);
        let tokens = TrackedWriter::new(guard.create(&files.path(TOKENS_EXT))?);

        Ok(Self {
            files: files.clone(),
            max_doc,
            collators,
            terms_block_size: config.terms_block_size,
            in_memory: config.in_memory,
            entries: Vec::new(),
            term_index,
            terms,
            docs,
            tokens,
            guard,
        })
    }

    /// Builds the forward index of a field
    ///
    /// Returns `None` (and writes nothing) if the field has no frequencies
    /// or no positions.
    pub fn add_field(
        &mut self,
        field: &str,
        number: u32,
        terms: &dyn FieldTerms,
    ) -> Result<Option<FieldDirectoryEntry>> {
        if !(terms.has_freqs() && terms.has_positions()) {
            debug!("Field {} has no positions, skipping", field);
            return Ok(None);
        }

        let term_index_offset = self.term_index.position();
        let term_count = terms.size() as u64;
        self.term_index.write_u64(term_count)?;

        let mut dictionary = TermsWriter::new(self.collators.clone());
        dictionary.set_max_block_size(self.terms_block_size);

        // --- Scan phase

        let tmp_path = self.files.path(TERMVEC_TMP_EXT);
        let mut termvec = TermVectorWriter::new(self.guard.create(&tmp_path)?, self.max_doc);
        let mut seen_terms = 0u64;

        for term in terms.terms() {
            let term = term?;
            let term_id = dictionary.index_of(&term.term)?;
            if term_id as u64 != seen_terms {
                return Err(Error::corrupt(
                    field,
                    None,
                    format!("term {:?} listed twice", term.term),
                ));
            }
            seen_terms += 1;

            self.term_index.write_u64(self.terms.position())?;
            self.terms.write_str(&term.term)?;

            for posting in term.postings {
                let posting = posting?;
                check_posting(field, &posting, self.max_doc)?;
                termvec.append(posting.doc_id, term_id, &posting.positions)?;
            }
        }

        if seen_terms != term_count {
            return Err(Error::corrupt(
                field,
                None,
                format!("expected {} terms, got {}", term_count, seen_terms),
            ));
        }

        debug!(
            "[{}] Scanned {} terms ({} bytes of term vectors)",
            field,
            seen_terms,
            termvec.bytes_written()
        );
        let (heads, lengths) = termvec.finish()?;

        // --- Reversal phase

        let buffer = open_buffer(&tmp_path, self.in_memory)?;
        let doc_index_offset = self.docs.position();
        let mut token_count = 0u64;

        for doc_id in 0..self.max_doc {
            let doc = doc_id as usize;
            let pairs = read_document(buffer.as_ref(), heads[doc], lengths[doc])
                .map_err(|e| Error::format(tmp_path.display(), e))?;
            let tokens = merge_positions(field, doc_id, pairs)?;

            self.docs.write_u64(self.tokens.position())?;
            self.docs.write_u32(tokens.len() as u32)?;
            for term_id in tokens.iter() {
                self.tokens.write_u32(*term_id)?;
            }
            token_count += tokens.len() as u64;
        }

        drop(buffer);
        fs::remove_file(&tmp_path)?;

        // --- Dictionary

        let mut out = BufWriter::new(self.guard.create(&self.files.path(&dictionary_ext(number)))?);
        dictionary.write(&mut out)?;
        out.flush()?;

        info!(
            "Forward index for field {} of segment {}: {} terms, {} documents, {} tokens",
            field, self.files.name, term_count, self.max_doc, token_count
        );

        let entry = FieldDirectoryEntry {
            name: field.to_string(),
            number,
            term_index_offset,
            term_count,
            doc_index_offset,
            doc_count: self.max_doc,
        };
        self.entries.push(entry.clone());
        Ok(Some(entry))
    }

    /// Writes the field directory, closes all the files and keeps them
    pub fn finish(self) -> Result<Vec<FieldDirectoryEntry>> {
        let Self {
            files,
            entries,
            term_index,
            terms,
            docs,
            tokens,
            mut guard,
            ..
        } = self;

        let mut directory = TrackedWriter::new(guard.create(&files.path(FIELDS_EXT))?);
        directory.write_u32(entries.len() as u32)?;
        for entry in entries.iter() {
            entry.write(&mut directory)?;
        }

        for out in [directory, term_index, terms, docs, tokens] {
            out.finish()?;
        }

        guard.commit();
        Ok(entries)
    }
}

fn check_posting(field: &str, posting: &Posting, max_doc: DocId) -> Result<()> {
    if posting.doc_id >= max_doc {
        return Err(Error::corrupt(
            field,
            Some(posting.doc_id),
            format!("document beyond the segment size ({})", max_doc),
        ));
    }
    if posting.positions.len() != posting.freq as usize {
        return Err(Error::corrupt(
            field,
            Some(posting.doc_id),
            format!(
                "frequency {} but {} positions",
                posting.freq,
                posting.positions.len()
            ),
        ));
    }
    if posting.positions.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::corrupt(
            field,
            Some(posting.doc_id),
            "positions are not in ascending order",
        ));
    }
    Ok(())
}

/// Merges the (position, term) pairs of a document into the array of term
/// ids, checking that each position from 0 is held by exactly one term
pub(crate) fn merge_positions(
    field: &str,
    doc_id: DocId,
    mut pairs: Vec<(Position, TermId)>,
) -> Result<Vec<TermId>> {
    pairs.sort_unstable();

    let mut tokens = Vec::with_capacity(pairs.len());
    for (expected, (position, term_id)) in pairs.into_iter().enumerate() {
        let expected = expected as u64;
        let position = position as u64;
        if position < expected {
            return Err(Error::corrupt(
                field,
                Some(doc_id),
                format!("several terms at position {}", position),
            ));
        }
        if position > expected {
            return Err(Error::corrupt(
                field,
                Some(doc_id),
                format!("no term at position {}", expected),
            ));
        }
        tokens.push(term_id);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_positions() {
        let tokens = merge_positions("word", 0, vec![(2, 7), (0, 3), (1, 5), (3, 3)]).unwrap();
        assert_eq!(tokens, vec![3, 5, 7, 3]);

        assert!(merge_positions("word", 0, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_merge_positions_rejects_overlaps_and_gaps() {
        let err = merge_positions("word", 4, vec![(0, 1), (1, 2), (1, 3)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Corrupt forward index for field word, document 4: several terms at position 1"
        );

        let err = merge_positions("word", 4, vec![(0, 1), (2, 2)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Corrupt forward index for field word, document 4: no term at position 1"
        );

        assert!(merge_positions("word", 4, vec![(1, 1)]).is_err());
    }
}
