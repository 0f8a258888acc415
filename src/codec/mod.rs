//! Plugs the forward index into the segment writing of the host engine.
//!
//! A [`PostingsFormat`] persists the postings of a segment and reads them
//! back. The forward index format wraps another (delegate) format: it lets
//! the delegate write the postings unchanged, then builds the forward index
//! from the same postings. Formats are serialized with the segment (in the
//! `codec.cbor` file) so that a segment is always read back with the format
//! that wrote it.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    base::DocId,
    error::Result,
    forward::SegmentForwardIndex,
    postings::{FieldInfos, FieldTerms, Fields},
};

pub mod basic;
pub mod config;
pub mod forward;
pub mod registry;
pub mod segment;

pub use basic::BasicPostingsFormat;
pub use config::CodecConfig;
pub use forward::ForwardIndexPostingsFormat;
pub use registry::PostingsFormatRegistry;
pub use segment::{SegmentFiles, SegmentReadState, SegmentWriteState};

/// Segment information file; written last, a segment without it is not
/// complete
pub const CODEC_INFO_EXT: &str = "codec.cbor";

#[typetag::serde(tag = "type")]
pub trait PostingsFormat: Send + Sync {
    fn name(&self) -> &str;

    fn fields_consumer(
        &self,
        state: &SegmentWriteState,
        config: &CodecConfig,
    ) -> Result<Box<dyn FieldsConsumer>>;

    fn fields_producer(
        &self,
        state: &SegmentReadState,
        config: &CodecConfig,
    ) -> Result<Box<dyn FieldsProducer>>;

    fn clone_boxed(&self) -> Box<dyn PostingsFormat>;
}

/// Writes the postings of a segment
pub trait FieldsConsumer {
    /// Writes all the fields; formats may record attributes in the field
    /// metadata
    fn write(&mut self, fields: &dyn Fields, field_infos: &mut FieldInfos) -> Result<()>;
}

/// Reads back the postings of a segment
pub trait FieldsProducer: Fields + Send + Sync {
    /// The forward index of the segment, if one was built
    fn forward_index(&self) -> Option<&SegmentForwardIndex> {
        None
    }
}

/// Content of the segment information file
#[derive(Serialize, Deserialize)]
pub struct SegmentInfo {
    pub max_doc: DocId,
    pub field_infos: FieldInfos,
    pub postings_format: Box<dyn PostingsFormat>,
}

impl SegmentInfo {
    pub fn save(&self, files: &SegmentFiles) -> Result<()> {
        let mut out = BufWriter::new(File::create(files.path(CODEC_INFO_EXT))?);
        ciborium::ser::into_writer(self, &mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn load(files: &SegmentFiles) -> Result<Self> {
        let file = BufReader::new(File::open(files.path(CODEC_INFO_EXT))?);
        Ok(ciborium::de::from_reader(file)?)
    }
}

/// Selects the postings format from the configuration, writes and opens
/// segments
pub struct Codec {
    config: CodecConfig,
    registry: PostingsFormatRegistry,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self::with_registry(config, PostingsFormatRegistry::default())
    }

    pub fn with_registry(config: CodecConfig, registry: PostingsFormatRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut PostingsFormatRegistry {
        &mut self.registry
    }

    /// The delegate format itself, or the forward index format wrapping it
    pub fn postings_format(&self) -> Result<Box<dyn PostingsFormat>> {
        let delegate = self.registry.resolve(&self.config)?;
        if self.config.forward_index {
            Ok(Box::new(ForwardIndexPostingsFormat::new(delegate)))
        } else {
            Ok(delegate)
        }
    }

    /// Writes the postings of a segment (and the forward index if
    /// configured), then the segment information
    pub fn write_segment(&self, state: &mut SegmentWriteState, fields: &dyn Fields) -> Result<()> {
        let format = self.postings_format()?;
        info!(
            "Writing segment {} ({} documents) with postings format {}",
            state.files.name,
            state.max_doc,
            format.name()
        );

        let mut consumer = format.fields_consumer(state, &self.config)?;
        consumer.write(fields, &mut state.field_infos)?;

        SegmentInfo {
            max_doc: state.max_doc,
            field_infos: state.field_infos.clone(),
            postings_format: format,
        }
        .save(&state.files)
    }

    /// Opens a segment with the postings format that wrote it
    pub fn open_segment(&self, files: &SegmentFiles) -> Result<SegmentReader> {
        let info = SegmentInfo::load(files)?;
        let state = SegmentReadState {
            files: files.clone(),
            max_doc: info.max_doc,
            field_infos: info.field_infos.clone(),
        };
        let producer = info.postings_format.fields_producer(&state, &self.config)?;
        Ok(SegmentReader { info, producer })
    }
}

/// An opened segment
pub struct SegmentReader {
    info: SegmentInfo,
    producer: Box<dyn FieldsProducer>,
}

impl SegmentReader {
    pub fn max_doc(&self) -> DocId {
        self.info.max_doc
    }

    pub fn field_infos(&self) -> &FieldInfos {
        &self.info.field_infos
    }

    /// Name of the format the segment was written with
    pub fn postings_format(&self) -> &str {
        self.info.postings_format.name()
    }

    pub fn forward_index(&self) -> Option<&SegmentForwardIndex> {
        self.producer.forward_index()
    }
}

impl Fields for SegmentReader {
    fn names(&self) -> Vec<String> {
        self.producer.names()
    }

    fn terms(&self, field: &str) -> Option<&dyn FieldTerms> {
        self.producer.terms(field)
    }
}
