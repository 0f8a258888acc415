//! Term dictionary: bijection between term strings and dense ids, together
//! with the collated sort order of the terms (in both sensitivities)

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{
    base::{Len, TermId},
    collation::Collators,
    error::{Error, Result},
};

mod format;
mod reader;
mod sort;
mod writer;

pub use reader::TermsReader;
pub use writer::TermsWriter;

/// Default number of terms per block in persisted dictionaries
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4096;

pub trait Terms: Len + Send + Sync {
    /// Returns the id of a term, adding it if the dictionary is still
    /// writable
    fn index_of(&mut self, term: &str) -> Result<TermId>;

    /// Returns the id of a term if it is known
    fn id_of(&self, term: &str) -> Result<Option<TermId>>;

    /// Returns the term with the given id
    fn get(&self, id: TermId) -> Result<String>;

    /// Position of the term in the collated order
    fn sort_position(&self, id: TermId, case_sensitive: bool) -> Result<u32>;

    /// Inverse of [`Terms::sort_position`]
    fn id_at_sort_position(&self, position: u32, case_sensitive: bool) -> Result<TermId>;

    /// Serializes the dictionary; terms are frozen afterwards
    fn write(&mut self, destination: &mut dyn Write) -> Result<()>;

    fn write_to_path(&mut self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

/// Opens a writable dictionary, or a read-only one from a file produced by
/// [`Terms::write`]
///
/// With `use_blocks`, terms of a read-only dictionary are decoded block by
/// block on first access instead of eagerly.
pub fn open(
    for_writing: bool,
    collators: &Collators,
    source: Option<&Path>,
    use_blocks: bool,
) -> Result<Box<dyn Terms>> {
    if for_writing {
        return Ok(Box::new(TermsWriter::new(collators.clone())));
    }

    let path = source.ok_or_else(|| {
        Error::format("<none>", "a read-only term dictionary needs a source file")
    })?;
    Ok(Box::new(TermsReader::open(path, collators, use_blocks)?))
}

pub(crate) fn check_id(id: TermId, len: usize) -> Result<usize> {
    let ix = id as usize;
    if ix >= len {
        return Err(Error::out_of_range("term id", id, len as u64));
    }
    Ok(ix)
}
