use thiserror::Error;

use crate::base::DocId;

/// Errors raised while building or reading forward indices
#[derive(Error, Debug)]
pub enum Error {
    /// No postings format could be resolved to delegate ordinary postings to
    #[error("No postings format available: {0}")]
    CodecUnavailable(String),

    /// Position gaps or overlaps (or other inconsistent postings) found while
    /// reversing the postings of a field
    #[error("Corrupt forward index for field {field}{}: {detail}", doc_context(.doc_id))]
    CorruptForwardIndex {
        field: String,
        doc_id: Option<DocId>,
        detail: String,
    },

    #[error("Cannot create a collator for locale {locale}: {detail}")]
    Collation { locale: String, detail: String },

    #[error("Collator mismatch: dictionary was built with {found}, opened with {expected}")]
    CollatorMismatch { expected: String, found: String },

    #[error("{what} {value} out of range (limit {limit}){context}")]
    OutOfRange {
        what: &'static str,
        value: u64,
        limit: u64,
        context: String,
    },

    #[error("Term dictionary is frozen: {0}")]
    Frozen(String),

    #[error("No forward index for field {field} in segment {segment}")]
    UnknownField { segment: String, field: String },

    #[error("Invalid file {path}: {detail}")]
    Format { path: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CBOR serialization error: {0}")]
    Cbor(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn doc_context(doc_id: &Option<DocId>) -> String {
    match doc_id {
        Some(doc_id) => format!(", document {}", doc_id),
        None => String::new(),
    }
}

impl Error {
    pub fn out_of_range(what: &'static str, value: impl Into<u64>, limit: impl Into<u64>) -> Self {
        Error::OutOfRange {
            what,
            value: value.into(),
            limit: limit.into(),
            context: String::new(),
        }
    }

    pub fn corrupt(field: &str, doc_id: Option<DocId>, detail: impl Into<String>) -> Self {
        Error::CorruptForwardIndex {
            field: field.to_string(),
            doc_id,
            detail: detail.into(),
        }
    }

    pub fn format(path: impl std::fmt::Display, detail: impl std::fmt::Display) -> Self {
        Error::Format {
            path: path.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn collation(locale: &str, detail: impl Into<String>) -> Self {
        Error::Collation {
            locale: locale.to_string(),
            detail: detail.into(),
        }
    }

    /// Adds a location (segment, field, document) to range errors
    pub fn in_context(self, location: impl std::fmt::Display) -> Self {
        match self {
            Error::OutOfRange {
                what,
                value,
                limit,
                context,
            } => Error::OutOfRange {
                what,
                value,
                limit,
                context: format!("{} in {}", context, location),
            },
            other => other,
        }
    }
}

impl<T: std::fmt::Debug> From<ciborium::ser::Error<T>> for Error {
    fn from(e: ciborium::ser::Error<T>) -> Self {
        Error::Cbor(format!("{:?}", e))
    }
}

impl<T: std::fmt::Debug> From<ciborium::de::Error<T>> for Error {
    fn from(e: ciborium::de::Error<T>) -> Self {
        Error::Cbor(format!("{:?}", e))
    }
}
