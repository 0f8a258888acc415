use crate::{
    base::TermId,
    collation::{Collator, Collators, Sensitivity},
};

/// Permutation between term ids and collated positions
pub(crate) struct SortOrder {
    /// id -> position
    pub positions: Vec<u32>,
    /// position -> id
    pub ids: Vec<TermId>,
}

impl SortOrder {
    /// Stable sort of the ids by collation
    fn build(terms: &[String], collator: &Collator) -> Self {
        let mut ids: Vec<TermId> = (0..terms.len() as TermId).collect();
        ids.sort_by(|a, b| collator.compare(&terms[*a as usize], &terms[*b as usize]));

        let mut positions = vec![0u32; ids.len()];
        for (position, id) in ids.iter().enumerate() {
            positions[*id as usize] = position as u32;
        }

        Self { positions, ids }
    }
}

pub(crate) struct SortOrders {
    pub sensitive: SortOrder,
    pub insensitive: SortOrder,
}

impl SortOrders {
    pub fn build(terms: &[String], collators: &Collators) -> Self {
        Self {
            sensitive: SortOrder::build(terms, collators.get(Sensitivity::Sensitive)),
            insensitive: SortOrder::build(terms, collators.get(Sensitivity::Insensitive)),
        }
    }

    pub fn get(&self, case_sensitive: bool) -> &SortOrder {
        match Sensitivity::from_case_sensitive(case_sensitive) {
            Sensitivity::Sensitive => &self.sensitive,
            Sensitivity::Insensitive => &self.insensitive,
        }
    }
}
