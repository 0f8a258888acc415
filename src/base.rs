//! Basic types shared by the dictionary, the forward index and the codec

/// Identifier of a term within one dictionary (dense, first-seen order)
pub type TermId = u32;

/// Segment-local document identifier
pub type DocId = u32;

/// Token position within a document field
pub type Position = u32;

/// Marks object that have a length
pub trait Len {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Size of a term identifier once serialized
pub const TERM_ID_SIZE: usize = std::mem::size_of::<TermId>();
