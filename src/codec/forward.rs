use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    config::CodecConfig,
    segment::{SegmentFiles, SegmentReadState, SegmentWriteState},
    FieldsConsumer, FieldsProducer, PostingsFormat,
};
use crate::{
    base::DocId,
    error::Result,
    forward::{
        ForwardIndexWriter, SegmentForwardIndex, FORWARD_INDEX_ATTRIBUTE, FORWARD_INDEX_VERSION,
    },
    postings::{FieldInfos, FieldTerms, Fields},
};

/// Writes the postings with a delegate format, and builds a forward index
/// for the fields with positions
#[derive(Serialize, Deserialize)]
pub struct ForwardIndexPostingsFormat {
    delegate: Box<dyn PostingsFormat>,
}

impl ForwardIndexPostingsFormat {
    pub fn new(delegate: Box<dyn PostingsFormat>) -> Self {
        Self { delegate }
    }
}

#[typetag::serde]
impl PostingsFormat for ForwardIndexPostingsFormat {
    fn name(&self) -> &str {
        "forward-index"
    }

    fn fields_consumer(
        &self,
        state: &SegmentWriteState,
        config: &CodecConfig,
    ) -> Result<Box<dyn FieldsConsumer>> {
        Ok(Box::new(ForwardIndexFieldsConsumer {
            delegate: self.delegate.fields_consumer(state, config)?,
            files: state.files.clone(),
            max_doc: state.max_doc,
            config: config.clone(),
        }))
    }

    fn fields_producer(
        &self,
        state: &SegmentReadState,
        config: &CodecConfig,
    ) -> Result<Box<dyn FieldsProducer>> {
        Ok(Box::new(ForwardIndexFieldsProducer {
            delegate: self.delegate.fields_producer(state, config)?,
            forward_index: SegmentForwardIndex::open(state, config)?,
        }))
    }

    fn clone_boxed(&self) -> Box<dyn PostingsFormat> {
        Box::new(Self::new(self.delegate.clone_boxed()))
    }
}

struct ForwardIndexFieldsConsumer {
    delegate: Box<dyn FieldsConsumer>,
    files: SegmentFiles,
    max_doc: DocId,
    config: CodecConfig,
}

impl FieldsConsumer for ForwardIndexFieldsConsumer {
    fn write(&mut self, fields: &dyn Fields, field_infos: &mut FieldInfos) -> Result<()> {
        self.delegate.write(fields, field_infos)?;

        let mut writer = ForwardIndexWriter::create(&self.files, self.max_doc, &self.config)?;
        let mut built = Vec::new();
        for name in fields.names() {
            let number = match field_infos.get(&name) {
                Some(info)
                    if info.index_options.has_freqs() && info.index_options.has_positions() =>
                {
                    info.number
                }
                Some(_) => {
                    debug!("Field {} is not indexed with positions", name);
                    continue;
                }
                None => {
                    debug!("Field {} has no metadata, skipping", name);
                    continue;
                }
            };

            if let Some(terms) = fields.terms(&name) {
                if writer.add_field(&name, number, terms)?.is_some() {
                    built.push(name);
                }
            }
        }
        writer.finish()?;

        // Only once everything has been written
        for name in built {
            if let Some(info) = field_infos.get_mut(&name) {
                info.put_attribute(FORWARD_INDEX_ATTRIBUTE, FORWARD_INDEX_VERSION);
            }
        }
        Ok(())
    }
}

struct ForwardIndexFieldsProducer {
    delegate: Box<dyn FieldsProducer>,
    forward_index: SegmentForwardIndex,
}

impl Fields for ForwardIndexFieldsProducer {
    fn names(&self) -> Vec<String> {
        self.delegate.names()
    }

    fn terms(&self, field: &str) -> Option<&dyn FieldTerms> {
        self.delegate.terms(field)
    }
}

impl FieldsProducer for ForwardIndexFieldsProducer {
    fn forward_index(&self) -> Option<&SegmentForwardIndex> {
        Some(&self.forward_index)
    }
}
