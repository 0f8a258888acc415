//! Forward index: for each document and field with positions, the array of
//! the term ids at each position.
//!
//! The forward index is built from the postings of a segment (see
//! [`builder`]) and written as companion files next to the segment files:
//!
//! - the field directory (`fwdfields`)
//! - the term index (`fwdtermindex`), term ordinal -> offset in the terms file
//! - the term strings (`fwdterms`)
//! - the document index (`fwddocs`), document -> range in the tokens file
//! - the tokens (`fwdtokens`)
//! - one term dictionary per field (`fwddict<field number>`)

use crate::{
    base::DocId,
    error::{Error, Result},
    utils::{buffer::Buffer, output::TrackedWriter},
};

pub mod builder;
pub mod reader;
mod termvec;

pub use builder::ForwardIndexWriter;
pub use reader::SegmentForwardIndex;

pub const FIELDS_EXT: &str = "fwdfields";
pub const TERM_INDEX_EXT: &str = "fwdtermindex";
pub const TERMS_EXT: &str = "fwdterms";
pub const DOCS_EXT: &str = "fwddocs";
pub const TOKENS_EXT: &str = "fwdtokens";
pub const TERMVEC_TMP_EXT: &str = "fwdtermvec.tmp";

/// Field attribute marking fields having a forward index
pub const FORWARD_INDEX_ATTRIBUTE: &str = "forward-index";
pub const FORWARD_INDEX_VERSION: &str = "1";

/// Size of an entry of the document index (offset + length)
pub(crate) const DOC_ENTRY_SIZE: usize = 8 + 4;

/// Smallest size of a field directory entry (empty name)
const MIN_FIELD_ENTRY_SIZE: usize = 4 + 32;

pub fn dictionary_ext(field_number: u32) -> String {
    format!("fwddict{}", field_number)
}

/// Location of the forward index data of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDirectoryEntry {
    pub name: String,
    pub number: u32,
    /// Offset of the field section in the term index
    pub term_index_offset: u64,
    pub term_count: u64,
    /// Offset of the field section in the document index
    pub doc_index_offset: u64,
    pub doc_count: DocId,
}

impl FieldDirectoryEntry {
    pub(crate) fn write(&self, out: &mut TrackedWriter) -> std::io::Result<()> {
        out.write_str(&self.name)?;
        out.write_u32(self.number)?;
        out.write_u64(self.term_index_offset)?;
        out.write_u64(self.term_count)?;
        out.write_u64(self.doc_index_offset)?;
        out.write_u32(self.doc_count)
    }

    /// Reads the whole directory (leading count, then the entries)
    pub(crate) fn read_all(buffer: &dyn Buffer, path: &str) -> Result<Vec<Self>> {
        let corrupted = |e: std::io::Error| Error::format(path, e);

        let count = buffer.u32_at(0).map_err(corrupted)? as usize;
        if count > buffer.len().saturating_sub(4) / MIN_FIELD_ENTRY_SIZE {
            return Err(Error::format(
                path,
                format!("{} fields do not fit in {} bytes", count, buffer.len()),
            ));
        }

        let mut entries = Vec::with_capacity(count);
        let mut offset = 4;
        for _ in 0..count {
            let len = buffer.u32_at(offset).map_err(corrupted)? as usize;
            let name = buffer.slice(offset + 4, offset + 4 + len).map_err(corrupted)?;
            let name = std::str::from_utf8(name)
                .map_err(|e| Error::format(path, e))?
                .to_string();
            offset += 4 + len;

            entries.push(FieldDirectoryEntry {
                name,
                number: buffer.u32_at(offset).map_err(corrupted)?,
                term_index_offset: buffer.u64_at(offset + 4).map_err(corrupted)?,
                term_count: buffer.u64_at(offset + 12).map_err(corrupted)?,
                doc_index_offset: buffer.u64_at(offset + 20).map_err(corrupted)?,
                doc_count: buffer.u32_at(offset + 28).map_err(corrupted)?,
            });
            offset += 32;
        }
        Ok(entries)
    }
}
