//! Postings as exposed by the host indexing engine
//!
//! A segment exposes its [`Fields`]; each field exposes its terms in the
//! host's native order ([`FieldTerms`]), and each term its postings, i.e.
//! the documents containing the term with the ascending positions of the
//! occurrences.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    base::{DocId, Position},
    error::Result,
};

/// What is recorded in the postings of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexOptions {
    Docs,
    DocsAndFreqs,
    DocsFreqsAndPositions,
}

impl IndexOptions {
    pub fn has_freqs(&self) -> bool {
        *self >= IndexOptions::DocsAndFreqs
    }

    pub fn has_positions(&self) -> bool {
        *self >= IndexOptions::DocsFreqsAndPositions
    }
}

/// Metadata of a field within a segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub number: u32,
    pub index_options: IndexOptions,
    pub attributes: BTreeMap<String, String>,
}

impl FieldInfo {
    pub fn put_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }
}

/// Metadata of all the fields of a segment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldInfos {
    fields: Vec<FieldInfo>,
}

impl FieldInfos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field (if not already present) and returns its metadata
    pub fn add(&mut self, name: &str, index_options: IndexOptions) -> &mut FieldInfo {
        let ix = match self.fields.iter().position(|f| f.name == name) {
            Some(ix) => ix,
            None => {
                self.fields.push(FieldInfo {
                    name: name.to_string(),
                    number: self.fields.len() as u32,
                    index_options,
                    attributes: BTreeMap::new(),
                });
                self.fields.len() - 1
            }
        };
        &mut self.fields[ix]
    }

    pub fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldInfo> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The occurrences of a term in one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    /// Number of occurrences
    pub freq: u32,
    /// Ascending positions (empty if the field has no positions)
    pub positions: Vec<Position>,
}

/// A term and its postings (ordered by document)
pub struct TermPostings<'a> {
    pub term: String,
    pub postings: Box<dyn Iterator<Item = Result<Posting>> + 'a>,
}

/// The terms of a field
pub trait FieldTerms {
    fn has_freqs(&self) -> bool;
    fn has_positions(&self) -> bool;

    /// Number of terms
    fn size(&self) -> usize;

    /// Terms in the host's native order
    fn terms<'a>(&'a self) -> Box<dyn Iterator<Item = Result<TermPostings<'a>>> + 'a>;
}

/// The fields of a segment
pub trait Fields {
    /// Field names in the host's order
    fn names(&self) -> Vec<String>;

    fn terms(&self, field: &str) -> Option<&dyn FieldTerms>;
}

//
// ---- In-memory postings
//

/// Postings of one field kept in memory: term -> document -> positions
pub struct MemoryFieldTerms {
    index_options: IndexOptions,
    terms: BTreeMap<String, BTreeMap<DocId, Vec<Position>>>,
}

impl MemoryFieldTerms {
    fn new(index_options: IndexOptions) -> Self {
        Self {
            index_options,
            terms: BTreeMap::new(),
        }
    }
}

impl FieldTerms for MemoryFieldTerms {
    fn has_freqs(&self) -> bool {
        self.index_options.has_freqs()
    }

    fn has_positions(&self) -> bool {
        self.index_options.has_positions()
    }

    fn size(&self) -> usize {
        self.terms.len()
    }

    fn terms<'a>(&'a self) -> Box<dyn Iterator<Item = Result<TermPostings<'a>>> + 'a> {
        let with_freqs = self.has_freqs();
        let with_positions = self.has_positions();
        Box::new(self.terms.iter().map(move |(term, docs)| {
            Ok(TermPostings {
                term: term.clone(),
                postings: Box::new(docs.iter().map(move |(doc_id, positions)| {
                    let mut positions = positions.clone();
                    positions.sort_unstable();
                    Ok(Posting {
                        doc_id: *doc_id,
                        freq: if with_freqs { positions.len() as u32 } else { 1 },
                        positions: if with_positions { positions } else { Vec::new() },
                    })
                })),
            })
        }))
    }
}

/// Inverts documents into in-memory postings (terms are ordered by their
/// UTF-8 bytes, fields by name)
#[derive(Default)]
pub struct MemoryFields {
    fields: BTreeMap<String, MemoryFieldTerms>,
    max_doc: DocId,
}

impl MemoryFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: &str, index_options: IndexOptions) {
        self.fields
            .entry(name.to_string())
            .or_insert_with(|| MemoryFieldTerms::new(index_options));
    }

    /// Adds the tokens of a document field (positions start at 0)
    pub fn add_document<S: AsRef<str>>(&mut self, doc_id: DocId, field: &str, tokens: &[S]) {
        for (position, token) in tokens.iter().enumerate() {
            self.add_occurrence(field, token.as_ref(), doc_id, position as Position);
        }
        self.max_doc = self.max_doc.max(doc_id + 1);
    }

    /// Adds a single occurrence (the field is created with positions if
    /// needed)
    pub fn add_occurrence(&mut self, field: &str, term: &str, doc_id: DocId, position: Position) {
        let field = self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| MemoryFieldTerms::new(IndexOptions::DocsFreqsAndPositions));
        field
            .terms
            .entry(term.to_string())
            .or_default()
            .entry(doc_id)
            .or_default()
            .push(position);
        self.max_doc = self.max_doc.max(doc_id + 1);
    }

    /// Number of documents (one more than the largest document ID)
    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }

    /// Field metadata, numbered in field order
    pub fn field_infos(&self) -> FieldInfos {
        let mut infos = FieldInfos::new();
        for (name, field) in self.fields.iter() {
            infos.add(name, field.index_options);
        }
        infos
    }
}

impl Fields for MemoryFields {
    fn names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn terms(&self, field: &str) -> Option<&dyn FieldTerms> {
        self.fields.get(field).map(|f| f as &dyn FieldTerms)
    }
}
