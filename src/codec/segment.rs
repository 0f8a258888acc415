use std::path::{Path, PathBuf};

use crate::{base::DocId, postings::FieldInfos};

/// Names the files of a segment: `{name}[_{suffix}].{ext}` in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFiles {
    pub directory: PathBuf,
    pub name: String,
    pub suffix: Option<String>,
}

impl SegmentFiles {
    pub fn new(directory: &Path, name: &str) -> Self {
        Self {
            directory: directory.to_path_buf(),
            name: name.to_string(),
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    pub fn file_name(&self, ext: &str) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}_{}.{}", self.name, suffix, ext),
            None => format!("{}.{}", self.name, ext),
        }
    }

    pub fn path(&self, ext: &str) -> PathBuf {
        self.directory.join(self.file_name(ext))
    }
}

/// What a postings format gets when a segment is written
#[derive(Debug, Clone)]
pub struct SegmentWriteState {
    pub files: SegmentFiles,
    /// Number of documents of the segment
    pub max_doc: DocId,
    pub field_infos: FieldInfos,
}

impl SegmentWriteState {
    pub fn new(files: SegmentFiles, max_doc: DocId, field_infos: FieldInfos) -> Self {
        Self {
            files,
            max_doc,
            field_infos,
        }
    }
}

/// What a postings format gets when a segment is opened
#[derive(Debug, Clone)]
pub struct SegmentReadState {
    pub files: SegmentFiles,
    pub max_doc: DocId,
    pub field_infos: FieldInfos,
}
