use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use log::debug;

use super::{check_id, format::TermsHeader, Terms};
use crate::{
    base::{Len, TermId},
    collation::{Collator, Collators, Sensitivity},
    error::{Error, Result},
    utils::buffer::{open_buffer, Buffer},
};

/// A persisted (immutable) dictionary
///
/// Term strings are decoded block by block; when opened without blocks, all
/// the blocks are decoded when opening and a term -> id map is built.
/// Otherwise, the file is memory mapped and blocks are decoded on first
/// access.
pub struct TermsReader {
    path: PathBuf,
    header: TermsHeader,
    buffer: Box<dyn Buffer>,
    blocks: Vec<OnceLock<Vec<String>>>,
    /// term -> id (only when fully loaded)
    ids: Option<HashMap<String, TermId>>,
    /// Used for lookups through the sorted order
    collator: Collator,
}

impl TermsReader {
    pub fn open(path: &Path, collators: &Collators, use_blocks: bool) -> Result<Self> {
        let buffer = open_buffer(path, !use_blocks)?;
        let header =
            TermsHeader::read(buffer.as_ref()).map_err(|e| Error::format(path.display(), e))?;
        collators.check_compatible(&header.locale, header.collator_tag)?;

        let mut reader = Self {
            path: path.to_path_buf(),
            blocks: (0..header.block_count).map(|_| OnceLock::new()).collect(),
            header,
            buffer,
            ids: None,
            collator: collators.get(Sensitivity::Sensitive).clone(),
        };

        if !use_blocks {
            let mut ids = HashMap::with_capacity(reader.len());
            for block_ix in 0..reader.blocks.len() {
                let first_id = block_ix * reader.header.block_size as usize;
                for (ix, term) in reader.block(block_ix)?.iter().enumerate() {
                    ids.insert(term.clone(), (first_id + ix) as TermId);
                }
            }
            reader.ids = Some(ids);
        }

        debug!(
            "Opened term dictionary {} ({} terms, blocks: {})",
            path.display(),
            reader.len(),
            use_blocks
        );
        Ok(reader)
    }

    pub fn block_size(&self) -> usize {
        self.header.block_size as usize
    }

    fn corrupted(&self, detail: impl std::fmt::Display) -> Error {
        Error::format(self.path.display(), detail)
    }

    /// Returns the terms of a block, decoding them if needed
    fn block(&self, block_ix: usize) -> Result<&Vec<String>> {
        if let Some(block) = self.blocks[block_ix].get() {
            return Ok(block);
        }

        let decoded = self.decode_block(block_ix)?;
        Ok(self.blocks[block_ix].get_or_init(|| decoded))
    }

    fn decode_block(&self, block_ix: usize) -> Result<Vec<String>> {
        let table = self.header.block_table_offset() + 8 * block_ix;
        let start = self.buffer.u64_at(table).map_err(|e| self.corrupted(e))? as usize;
        let end = self.buffer.u64_at(table + 8).map_err(|e| self.corrupted(e))? as usize;
        let data = self.buffer.slice(start, end).map_err(|e| self.corrupted(e))?;

        let block_size = self.block_size();
        let count = block_size.min(self.len() - block_ix * block_size);
        let mut terms = Vec::with_capacity(count);
        let mut offset = 0;
        for _ in 0..count {
            let len_bytes = data
                .get(offset..offset + 4)
                .ok_or_else(|| self.corrupted(format!("truncated block {}", block_ix)))?;
            let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                as usize;
            let bytes = data
                .get(offset + 4..offset + 4 + len)
                .ok_or_else(|| self.corrupted(format!("truncated block {}", block_ix)))?;
            let term = std::str::from_utf8(bytes).map_err(|e| self.corrupted(e))?;
            terms.push(term.to_string());
            offset += 4 + len;
        }

        debug!("Decoded block {} of {}", block_ix, self.path.display());
        Ok(terms)
    }

    /// Reads an entry of one of the permutation tables
    fn table_entry(&self, table: usize, ix: usize) -> Result<u32> {
        self.buffer
            .u32_at(self.header.table_offset(table) + 4 * ix)
            .map_err(|e| self.corrupted(e))
    }

    /// Binary search through the sensitive order
    fn search(&self, term: &str) -> Result<Option<TermId>> {
        let (mut low, mut high) = (0usize, self.len());
        while low < high {
            let mid = (low + high) / 2;
            let id = self.table_entry(1, mid)?;
            match self.collator.compare(&self.get(id)?, term) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Ok(Some(id)),
            }
        }
        Ok(None)
    }
}

impl Len for TermsReader {
    fn len(&self) -> usize {
        self.header.term_count as usize
    }
}

impl Terms for TermsReader {
    fn index_of(&mut self, term: &str) -> Result<TermId> {
        self.id_of(term)?
            .ok_or_else(|| Error::Frozen(format!("cannot add term {:?}", term)))
    }

    fn id_of(&self, term: &str) -> Result<Option<TermId>> {
        match &self.ids {
            Some(ids) => Ok(ids.get(term).copied()),
            None => self.search(term),
        }
    }

    fn get(&self, id: TermId) -> Result<String> {
        let ix = check_id(id, self.len())?;
        let block_size = self.block_size();
        Ok(self.block(ix / block_size)?[ix % block_size].clone())
    }

    fn sort_position(&self, id: TermId, case_sensitive: bool) -> Result<u32> {
        let ix = check_id(id, self.len())?;
        self.table_entry(if case_sensitive { 0 } else { 2 }, ix)
    }

    fn id_at_sort_position(&self, position: u32, case_sensitive: bool) -> Result<TermId> {
        let ix = position as usize;
        if ix >= self.len() {
            return Err(Error::out_of_range(
                "sort position",
                position,
                self.len() as u64,
            ));
        }
        self.table_entry(if case_sensitive { 1 } else { 3 }, ix)
    }

    fn write(&mut self, _destination: &mut dyn Write) -> Result<()> {
        Err(Error::Frozen(format!(
            "{} is read-only",
            self.path.display()
        )))
    }
}
