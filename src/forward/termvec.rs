//! Intermediate term-major store used to reverse the postings.
//!
//! Each posting becomes a fixed-format record appended to a temporary file:
//!
//! ```text
//! previous record of the same document (u64) | term id (u32)
//! occurrence count (u32) | positions (u32 × count)
//! ```
//!
//! Only the last record of each document is kept in memory: the records of a
//! document form a chain going backwards through the file.

use std::fs::File;

use crate::{
    base::{DocId, Position, TermId},
    utils::{buffer::Buffer, output::TrackedWriter},
};

/// Marks the end of a chain
pub(crate) const NO_RECORD: u64 = u64::MAX;

const RECORD_HEADER_SIZE: usize = 8 + 4 + 4;

pub(crate) struct TermVectorWriter {
    out: TrackedWriter,
    /// Last record of each document
    heads: Vec<u64>,
    /// Number of occurrences per document
    lengths: Vec<u64>,
}

impl TermVectorWriter {
    pub fn new(file: File, max_doc: DocId) -> Self {
        Self {
            out: TrackedWriter::new(file),
            heads: vec![NO_RECORD; max_doc as usize],
            lengths: vec![0; max_doc as usize],
        }
    }

    /// Appends the occurrences of a term in a document (the document ID must
    /// be lower than the number of documents)
    pub fn append(
        &mut self,
        doc_id: DocId,
        term_id: TermId,
        positions: &[Position],
    ) -> std::io::Result<()> {
        let doc = doc_id as usize;
        let offset = self.out.position();

        self.out.write_u64(self.heads[doc])?;
        self.out.write_u32(term_id)?;
        self.out.write_u32(positions.len() as u32)?;
        for position in positions {
            self.out.write_u32(*position)?;
        }

        self.heads[doc] = offset;
        self.lengths[doc] += positions.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.out.position()
    }

    /// Closes the file and returns the chain heads and document lengths
    pub fn finish(self) -> std::io::Result<(Vec<u64>, Vec<u64>)> {
        self.out.finish()?;
        Ok((self.heads, self.lengths))
    }
}

/// Reads back all the (position, term id) pairs of a document
pub(crate) fn read_document(
    buffer: &dyn Buffer,
    head: u64,
    length: u64,
) -> std::io::Result<Vec<(Position, TermId)>> {
    let mut pairs = Vec::with_capacity(length as usize);
    let mut offset = head;
    while offset != NO_RECORD {
        let start = offset as usize;
        let previous = buffer.u64_at(start)?;
        let term_id = buffer.u32_at(start + 8)?;
        let count = buffer.u32_at(start + 12)? as usize;
        for ix in 0..count {
            let position = buffer.u32_at(start + RECORD_HEADER_SIZE + 4 * ix)?;
            pairs.push((position, term_id));
        }
        offset = previous;
    }
    Ok(pairs)
}
