use std::collections::BTreeMap;

use log::debug;

use super::{basic::BasicPostingsFormat, config::CodecConfig, PostingsFormat};
use crate::error::{Error, Result};

/// The postings formats ordinary postings can be delegated to, by name
pub struct PostingsFormatRegistry {
    formats: BTreeMap<String, Box<dyn PostingsFormat>>,
}

impl PostingsFormatRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            formats: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, format: Box<dyn PostingsFormat>) {
        self.formats.insert(format.name().to_string(), format);
    }

    pub fn get(&self, name: &str) -> Option<Box<dyn PostingsFormat>> {
        self.formats.get(name).map(|format| format.clone_boxed())
    }

    pub fn names(&self) -> Vec<&str> {
        self.formats.keys().map(|name| name.as_str()).collect()
    }

    /// Picks the configured delegate, else the default format
    pub fn resolve(&self, config: &CodecConfig) -> Result<Box<dyn PostingsFormat>> {
        if let Some(name) = &config.delegate_postings_format {
            match self.get(name) {
                Some(format) => return Ok(format),
                None => debug!(
                    "Postings format {} is not registered, using {}",
                    name, config.default_postings_format
                ),
            }
        }

        self.get(&config.default_postings_format).ok_or_else(|| {
            Error::CodecUnavailable(format!(
                "no delegate postings format among [{}] (delegate: {}, default: {})",
                self.names().join(", "),
                config.delegate_postings_format.as_deref().unwrap_or("none"),
                config.default_postings_format
            ))
        })
    }
}

impl Default for PostingsFormatRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BasicPostingsFormat::default()));
        registry
    }
}
