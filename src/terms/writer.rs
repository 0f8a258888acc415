use std::{collections::HashMap, io::Write, sync::OnceLock};

use byteorder::{BigEndian, WriteBytesExt};
use log::debug;

use super::{check_id, format::TermsHeader, sort::SortOrders, Terms, DEFAULT_MAX_BLOCK_SIZE};
use crate::{
    base::{Len, TermId},
    collation::Collators,
    error::{Error, Result},
};

/// A dictionary being built: ids are assigned in first-seen order
pub struct TermsWriter {
    collators: Collators,

    /// id -> term
    terms: Vec<String>,

    /// term -> id
    ids: HashMap<String, TermId>,

    /// Number of terms per block when written
    max_block_size: usize,

    /// Sort orders, computed when needed and reset when a term is added
    sort_orders: OnceLock<SortOrders>,

    /// Set once the dictionary has been written
    written: bool,
}

impl TermsWriter {
    pub fn new(collators: Collators) -> Self {
        Self {
            collators,
            terms: Vec::new(),
            ids: HashMap::new(),
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            sort_orders: OnceLock::new(),
            written: false,
        }
    }

    pub fn set_max_block_size(&mut self, max_block_size: usize) {
        self.max_block_size = max_block_size.max(1);
    }

    fn sort_orders(&self) -> &SortOrders {
        self.sort_orders
            .get_or_init(|| SortOrders::build(&self.terms, &self.collators))
    }
}

impl Len for TermsWriter {
    fn len(&self) -> usize {
        self.terms.len()
    }
}

impl Terms for TermsWriter {
    fn index_of(&mut self, term: &str) -> Result<TermId> {
        if let Some(id) = self.ids.get(term) {
            return Ok(*id);
        }
        if self.written {
            return Err(Error::Frozen(format!("cannot add term {:?}", term)));
        }

        let id: TermId = self
            .terms
            .len()
            .try_into()
            .map_err(|_| Error::out_of_range("term count", self.terms.len() as u64, TermId::MAX))?;
        self.terms.push(term.to_string());
        self.ids.insert(term.to_string(), id);
        self.sort_orders.take();
        Ok(id)
    }

    fn id_of(&self, term: &str) -> Result<Option<TermId>> {
        Ok(self.ids.get(term).copied())
    }

    fn get(&self, id: TermId) -> Result<String> {
        let ix = check_id(id, self.terms.len())?;
        Ok(self.terms[ix].clone())
    }

    fn sort_position(&self, id: TermId, case_sensitive: bool) -> Result<u32> {
        let ix = check_id(id, self.terms.len())?;
        Ok(self.sort_orders().get(case_sensitive).positions[ix])
    }

    fn id_at_sort_position(&self, position: u32, case_sensitive: bool) -> Result<TermId> {
        let ix = position as usize;
        if ix >= self.terms.len() {
            return Err(Error::out_of_range(
                "sort position",
                position,
                self.terms.len() as u64,
            ));
        }
        Ok(self.sort_orders().get(case_sensitive).ids[ix])
    }

    fn write(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.written {
            return Err(Error::Frozen("dictionary was already written".to_string()));
        }

        let config = self.collators.config();
        let header = TermsHeader::new(
            &config.locale,
            config.version.tag(),
            self.terms.len() as u32,
            self.max_block_size as u32,
        );
        header.write(out)?;

        let orders = self.sort_orders();
        for order in [&orders.sensitive, &orders.insensitive] {
            for position in order.positions.iter() {
                out.write_u32::<BigEndian>(*position)?;
            }
            for id in order.ids.iter() {
                out.write_u32::<BigEndian>(*id)?;
            }
        }

        // Block table
        let mut offset = header.data_offset() as u64;
        out.write_u64::<BigEndian>(offset)?;
        for block in self.terms.chunks(self.max_block_size) {
            offset += block.iter().map(|t| 4 + t.len() as u64).sum::<u64>();
            out.write_u64::<BigEndian>(offset)?;
        }

        for term in self.terms.iter() {
            out.write_u32::<BigEndian>(term.len() as u32)?;
            out.write_all(term.as_bytes())?;
        }

        debug!(
            "Wrote term dictionary: {} terms in {} blocks",
            self.terms.len(),
            header.block_count
        );
        self.written = true;
        Ok(())
    }
}
