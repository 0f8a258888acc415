//! Forward index and term dictionaries for a corpus search engine.
//!
//! The postings of a segment (term -> documents -> positions) are turned into
//! per-document arrays of term ids (the forward index), together with a term
//! dictionary per field giving the term strings and their collated order.

pub mod base;
pub mod codec;
pub mod collation;
pub mod error;
pub mod forward;
pub mod grouping;
pub mod postings;
pub mod terms;

pub mod utils {
    pub mod buffer;
    pub mod output;
}
