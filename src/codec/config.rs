use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::{collation::CollatorConfig, error::Result, terms::DEFAULT_MAX_BLOCK_SIZE};

/// Configuration of the codec
#[derive(Derivative, Clone, Debug, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct CodecConfig {
    /// Builds a forward index next to the postings
    #[derivative(Default(value = "true"))]
    pub forward_index: bool,

    /// Name of the postings format the ordinary postings are delegated to
    pub delegate_postings_format: Option<String>,

    /// Used when no delegate is configured or when it is not registered
    #[derivative(Default(value = "String::from(\"basic\")"))]
    pub default_postings_format: String,

    pub collator: CollatorConfig,

    /// Number of terms per block of the term dictionaries
    #[derivative(Default(value = "DEFAULT_MAX_BLOCK_SIZE"))]
    pub terms_block_size: usize,

    /// Decode the term dictionaries block by block when reading
    #[derivative(Default(value = "true"))]
    pub use_blocks: bool,

    /// Load the files in memory rather than memory-mapping them
    pub in_memory: bool,
}

impl CodecConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(ciborium::de::from_reader(file)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        ciborium::ser::into_writer(self, &mut out)?;
        out.flush()?;
        Ok(())
    }
}
