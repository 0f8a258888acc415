use log::debug;

use super::{
    dictionary_ext, FieldDirectoryEntry, DOCS_EXT, DOC_ENTRY_SIZE, FIELDS_EXT, TERMS_EXT,
    TERM_INDEX_EXT, TOKENS_EXT,
};
use crate::{
    base::{DocId, Len, Position, TermId, TERM_ID_SIZE},
    codec::{
        config::CodecConfig,
        segment::{SegmentFiles, SegmentReadState},
    },
    collation::Collators,
    error::{Error, Result},
    terms::{self, Terms},
    utils::buffer::{open_buffer, Buffer},
};

/// Read access to the forward index of one segment
///
/// All the accessors take the field name; fields without a forward index
/// raise [`Error::UnknownField`].
pub struct SegmentForwardIndex {
    files: SegmentFiles,
    entries: Vec<FieldDirectoryEntry>,
    dictionaries: Vec<Box<dyn Terms>>,

    term_index: Box<dyn Buffer>,
    terms: Box<dyn Buffer>,
    docs: Box<dyn Buffer>,
    tokens: Box<dyn Buffer>,
}

impl SegmentForwardIndex {
    pub fn open(state: &SegmentReadState, config: &CodecConfig) -> Result<Self> {
        let files = &state.files;
        let directory_path = files.path(FIELDS_EXT);
        let directory = open_buffer(&directory_path, true)?;
        let entries = FieldDirectoryEntry::read_all(
            directory.as_ref(),
            &directory_path.display().to_string(),
        )?;
        if let Some(entry) = entries.iter().find(|e| e.doc_count != state.max_doc) {
            return Err(Error::format(
                directory_path.display(),
                format!(
                    "field {} has {} documents, segment has {}",
                    entry.name, entry.doc_count, state.max_doc
                ),
            ));
        }

        let collators = Collators::new(config.collator.clone())?;
        let dictionaries = entries
            .iter()
            .map(|entry| {
                terms::open(
                    false,
                    &collators,
                    Some(files.path(&dictionary_ext(entry.number)).as_path()),
                    config.use_blocks,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let index = Self {
            files: files.clone(),
            term_index: open_buffer(&files.path(TERM_INDEX_EXT), config.in_memory)?,
            terms: open_buffer(&files.path(TERMS_EXT), config.in_memory)?,
            docs: open_buffer(&files.path(DOCS_EXT), config.in_memory)?,
            tokens: open_buffer(&files.path(TOKENS_EXT), config.in_memory)?,
            entries,
            dictionaries,
        };

        debug!(
            "Opened the forward index of segment {} ({} fields)",
            files.name,
            index.entries.len()
        );
        Ok(index)
    }

    fn corrupted(&self, ext: &str, detail: impl std::fmt::Display) -> Error {
        Error::format(self.files.file_name(ext), detail)
    }

    fn lookup(&self, field: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name == field)
            .ok_or_else(|| Error::UnknownField {
                segment: self.files.name.clone(),
                field: field.to_string(),
            })
    }

    fn field_context(&self, field: &str) -> String {
        format!("segment {}, field {}", self.files.name, field)
    }

    /// Fields having a forward index, in build order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDirectoryEntry> {
        self.entries.iter()
    }

    pub fn field(&self, field: &str) -> Result<&FieldDirectoryEntry> {
        Ok(&self.entries[self.lookup(field)?])
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.lookup(field).is_ok()
    }

    /// The term dictionary of a field
    pub fn terms(&self, field: &str) -> Result<&dyn Terms> {
        Ok(self.dictionaries[self.lookup(field)?].as_ref())
    }

    pub fn resolve_term_id(&self, field: &str, term: &str) -> Result<Option<TermId>> {
        self.terms(field)?.id_of(term)
    }

    pub fn term_string(&self, field: &str, term_id: TermId) -> Result<String> {
        self.terms(field)?
            .get(term_id)
            .map_err(|e| e.in_context(self.field_context(field)))
    }

    /// Reads a term through the term index, i.e. by its ordinal in the
    /// host's order
    pub fn term_at_ordinal(&self, field: &str, ordinal: u64) -> Result<String> {
        let entry = self.field(field)?;
        if ordinal >= entry.term_count {
            return Err(Error::out_of_range("term ordinal", ordinal, entry.term_count)
                .in_context(self.field_context(field)));
        }

        let index_offset = (entry.term_index_offset + 8 + 8 * ordinal) as usize;
        let offset = self
            .term_index
            .u64_at(index_offset)
            .map_err(|e| self.corrupted(TERM_INDEX_EXT, e))? as usize;
        let len = self
            .terms
            .u32_at(offset)
            .map_err(|e| self.corrupted(TERMS_EXT, e))? as usize;
        let bytes = self
            .terms
            .slice(offset + 4, offset + 4 + len)
            .map_err(|e| self.corrupted(TERMS_EXT, e))?;
        std::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|e| self.corrupted(TERMS_EXT, e))
    }

    pub fn sort_position(&self, field: &str, term_id: TermId, case_sensitive: bool) -> Result<u32> {
        self.terms(field)?
            .sort_position(term_id, case_sensitive)
            .map_err(|e| e.in_context(self.field_context(field)))
    }

    pub fn id_at_sort_position(
        &self,
        field: &str,
        position: u32,
        case_sensitive: bool,
    ) -> Result<TermId> {
        self.terms(field)?
            .id_at_sort_position(position, case_sensitive)
            .map_err(|e| e.in_context(self.field_context(field)))
    }

    /// Offset (in the tokens file) and length of a document
    fn doc_entry(&self, field: &str, doc_id: DocId) -> Result<(usize, u32)> {
        let entry = self.field(field)?;
        if doc_id >= entry.doc_count {
            return Err(Error::out_of_range("document", doc_id, entry.doc_count)
                .in_context(self.field_context(field)));
        }

        let offset = entry.doc_index_offset as usize + DOC_ENTRY_SIZE * doc_id as usize;
        let start = self
            .docs
            .u64_at(offset)
            .map_err(|e| self.corrupted(DOCS_EXT, e))?;
        let length = self
            .docs
            .u32_at(offset + 8)
            .map_err(|e| self.corrupted(DOCS_EXT, e))?;
        Ok((start as usize, length))
    }

    /// Number of tokens of a document
    pub fn doc_length(&self, field: &str, doc_id: DocId) -> Result<u32> {
        Ok(self.doc_entry(field, doc_id)?.1)
    }

    /// Term ids at positions `[start, end)` of a document
    pub fn tokens_in_range(
        &self,
        field: &str,
        doc_id: DocId,
        start: Position,
        end: Position,
    ) -> Result<Vec<TermId>> {
        let (offset, length) = self.doc_entry(field, doc_id)?;
        let context = || format!("{}, document {}", self.field_context(field), doc_id);
        if end > length {
            return Err(Error::out_of_range("position", end, length).in_context(context()));
        }
        if start > end {
            return Err(Error::out_of_range("position", start, end).in_context(context()));
        }

        let bytes = self
            .tokens
            .slice(
                offset + TERM_ID_SIZE * start as usize,
                offset + TERM_ID_SIZE * end as usize,
            )
            .map_err(|e| self.corrupted(TOKENS_EXT, e))?;
        Ok(bytes
            .chunks_exact(TERM_ID_SIZE)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// All the term ids of a document
    pub fn tokens(&self, field: &str, doc_id: DocId) -> Result<Vec<TermId>> {
        let length = self.doc_length(field, doc_id)?;
        self.tokens_in_range(field, doc_id, 0, length)
    }

    /// Number of terms in the dictionary of a field
    pub fn term_count(&self, field: &str) -> Result<usize> {
        Ok(self.terms(field)?.len())
    }
}
