//! Collation used to order the terms of a dictionary.
//!
//! The collator is never global state: a [`CollatorConfig`] (locale and
//! version tag) is turned into a pair of [`Collator`]s, one per
//! [`Sensitivity`], and passed explicitly to every dictionary build and open.
//! The version tag is persisted with each dictionary since sort positions are
//! meaningless under another collation.

use std::{cmp::Ordering, fmt, sync::Arc};

use derivative::Derivative;
use icu_collator::{CollatorOptions, Strength};
use icu_locid::Locale;
use icu_provider::DataLocale;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version of the comparison rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollatorVersion {
    /// Lower-case comparison (insensitive) and code point order (sensitive),
    /// whatever the locale
    V1,
    /// Collation rules of the locale (CLDR): base letters, then diacritics,
    /// then case
    V2,
}

impl CollatorVersion {
    /// Tag stored in persisted dictionaries
    pub const fn tag(&self) -> u32 {
        match self {
            CollatorVersion::V1 => 1,
            CollatorVersion::V2 => 2,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(CollatorVersion::V1),
            2 => Some(CollatorVersion::V2),
            _ => None,
        }
    }
}

/// Case and diacritics sensitivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensitivity {
    Sensitive,
    Insensitive,
}

impl Sensitivity {
    pub fn from_case_sensitive(case_sensitive: bool) -> Self {
        if case_sensitive {
            Sensitivity::Sensitive
        } else {
            Sensitivity::Insensitive
        }
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, Sensitivity::Sensitive)
    }

    fn strength(&self) -> Strength {
        match self {
            Sensitivity::Sensitive => Strength::Tertiary,
            Sensitivity::Insensitive => Strength::Primary,
        }
    }
}

#[derive(Derivative, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct CollatorConfig {
    /// Locale of the collator (BCP 47 tag, recorded with the dictionaries)
    #[derivative(Default(value = "String::from(\"en-GB\")"))]
    pub locale: String,

    #[derivative(Default(value = "CollatorVersion::V2"))]
    pub version: CollatorVersion,
}

impl CollatorConfig {
    pub fn new(locale: &str, version: CollatorVersion) -> Self {
        Self {
            locale: locale.to_string(),
            version,
        }
    }

    fn describe(locale: &str, tag: u32) -> String {
        format!("{} (version tag {})", locale, tag)
    }
}

#[derive(Clone)]
enum Rules {
    CodePoints,
    Locale(Arc<icu_collator::Collator>),
}

/// Compares terms with a given version and sensitivity
///
/// Sensitive collators only consider two terms equal if they are the same
/// string: terms the locale rules do not tell apart are ordered by code
/// points.
#[derive(Clone)]
pub struct Collator {
    version: CollatorVersion,
    sensitivity: Sensitivity,
    rules: Rules,
}

impl Collator {
    pub fn new(locale: &str, version: CollatorVersion, sensitivity: Sensitivity) -> Result<Self> {
        let rules = match version {
            CollatorVersion::V1 => Rules::CodePoints,
            CollatorVersion::V2 => Rules::Locale(Arc::new(locale_collator(locale, sensitivity)?)),
        };
        Ok(Self {
            version,
            sensitivity,
            rules,
        })
    }

    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        match (&self.rules, self.sensitivity) {
            (Rules::CodePoints, Sensitivity::Sensitive) => left.cmp(right),
            (Rules::CodePoints, Sensitivity::Insensitive) => {
                left.to_lowercase().cmp(&right.to_lowercase())
            }
            (Rules::Locale(collator), Sensitivity::Sensitive) => collator
                .compare(left, right)
                .then_with(|| left.cmp(right)),
            (Rules::Locale(collator), Sensitivity::Insensitive) => collator.compare(left, right),
        }
    }
}

impl fmt::Debug for Collator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collator")
            .field("version", &self.version)
            .field("sensitivity", &self.sensitivity)
            .finish()
    }
}

fn locale_collator(locale: &str, sensitivity: Sensitivity) -> Result<icu_collator::Collator> {
    let parsed: Locale = locale
        .parse()
        .map_err(|e| Error::collation(locale, format!("{:?}", e)))?;

    let mut options = CollatorOptions::new();
    options.strength = Some(sensitivity.strength());
    icu_collator::Collator::try_new(&DataLocale::from(&parsed), options)
        .map_err(|e| Error::collation(locale, format!("{:?}", e)))
}

/// The pair of collators (sensitive and insensitive) derived from a
/// configuration
#[derive(Debug, Clone)]
pub struct Collators {
    config: CollatorConfig,
    sensitive: Collator,
    insensitive: Collator,
}

impl Collators {
    /// Fails if the locale is not a valid language tag
    pub fn new(config: CollatorConfig) -> Result<Self> {
        let sensitive = Collator::new(&config.locale, config.version, Sensitivity::Sensitive)?;
        let insensitive = Collator::new(&config.locale, config.version, Sensitivity::Insensitive)?;
        Ok(Self {
            config,
            sensitive,
            insensitive,
        })
    }

    pub fn config(&self) -> &CollatorConfig {
        &self.config
    }

    pub fn get(&self, sensitivity: Sensitivity) -> &Collator {
        match sensitivity {
            Sensitivity::Sensitive => &self.sensitive,
            Sensitivity::Insensitive => &self.insensitive,
        }
    }

    /// Checks that a persisted locale and version tag match this collator
    pub fn check_compatible(&self, locale: &str, tag: u32) -> Result<()> {
        if locale != self.config.locale || tag != self.config.version.tag() {
            return Err(Error::CollatorMismatch {
                expected: CollatorConfig::describe(&self.config.locale, self.config.version.tag()),
                found: CollatorConfig::describe(locale, tag),
            });
        }
        Ok(())
    }
}
