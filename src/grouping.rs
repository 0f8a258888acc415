//! Values used to group and sort hits.
//!
//! Values have a textual form used to pass them around (e.g. as group
//! identifiers): a tag, then the fields of the value, separated by `:`.
//! Composite values join their parts with `,`. Separators occurring in the
//! fields are escaped with `$` (`$DL` for `$`, `$CL` for `:`, `$CM` for `,`).
//!
//! Context words are segment-local term ids; their textual form holds the term
//! strings, resolved again against a segment when parsed.

use std::cmp::Ordering;

use log::debug;

use crate::{
    base::TermId,
    collation::{Collators, Sensitivity},
    error::Result,
    forward::SegmentForwardIndex,
};

const SEPARATOR: char = ':';
const COMPOSITE_SEPARATOR: char = ',';
const MULTIPLE_MARKER: &str = "mul";
/// Lowest decade representable as an `i32`
const LOWEST_DECADE: i32 = i32::MIN + 8;

/// Terms of a field, compared with a given sensitivity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTerms {
    pub field: String,
    pub sensitivity: Sensitivity,
    pub term_ids: Vec<TermId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A single word (e.g. the matched word)
    ContextWord(ContextTerms),
    /// A sequence of words (e.g. the words left of a hit)
    ContextWords(ContextTerms),
    /// First year of a decade
    Decade(i32),
    Int(i64),
    Str(String),
    Multiple(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn tag(&self) -> &'static str {
        match self {
            PropertyValue::ContextWord(_) => "cwo",
            PropertyValue::ContextWords(_) => "cws",
            PropertyValue::Decade(_) => "dec",
            PropertyValue::Int(_) => "int",
            PropertyValue::Str(_) => "str",
            PropertyValue::Multiple(_) => MULTIPLE_MARKER,
        }
    }

    /// Rank used to order values of different kinds
    fn rank(&self) -> u8 {
        match self {
            PropertyValue::ContextWord(_) => 0,
            PropertyValue::ContextWords(_) => 1,
            PropertyValue::Decade(_) => 2,
            PropertyValue::Int(_) => 3,
            PropertyValue::Str(_) => 4,
            PropertyValue::Multiple(_) => 5,
        }
    }

    /// Decade of a year (years before the lowest decade fall into it)
    pub fn decade(year: i32) -> Self {
        PropertyValue::Decade(year.checked_sub(year.rem_euclid(10)).unwrap_or(LOWEST_DECADE))
    }
}

fn escape(value: &str) -> String {
    value
        .replace('$', "$DL")
        .replace(SEPARATOR, "$CL")
        .replace(COMPOSITE_SEPARATOR, "$CM")
}

fn unescape(value: &str) -> Option<String> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let code: String = chars.by_ref().take(2).collect();
        match code.as_str() {
            "DL" => result.push('$'),
            "CL" => result.push(SEPARATOR),
            "CM" => result.push(COMPOSITE_SEPARATOR),
            _ => return None,
        }
    }
    Some(result)
}

fn sensitivity_code(sensitivity: Sensitivity) -> &'static str {
    match sensitivity {
        Sensitivity::Sensitive => "s",
        Sensitivity::Insensitive => "i",
    }
}

/// Serializes, parses and compares property values of one segment
pub struct GroupingContext<'a> {
    index: &'a SegmentForwardIndex,
    collators: &'a Collators,
}

impl<'a> GroupingContext<'a> {
    pub fn new(index: &'a SegmentForwardIndex, collators: &'a Collators) -> Self {
        Self { index, collators }
    }

    pub fn serialize(&self, value: &PropertyValue) -> Result<String> {
        match value {
            PropertyValue::Multiple(values) => {
                let mut parts = vec![MULTIPLE_MARKER.to_string()];
                self.serialize_parts(values, &mut parts)?;
                Ok(parts.join(&COMPOSITE_SEPARATOR.to_string()))
            }
            value => self.serialize_single(value),
        }
    }

    /// Nested composite values are flattened
    fn serialize_parts(&self, values: &[PropertyValue], parts: &mut Vec<String>) -> Result<()> {
        for value in values {
            match value {
                PropertyValue::Multiple(values) => self.serialize_parts(values, parts)?,
                value => parts.push(self.serialize_single(value)?),
            }
        }
        Ok(())
    }

    fn serialize_single(&self, value: &PropertyValue) -> Result<String> {
        let mut fields = vec![value.tag().to_string()];
        match value {
            PropertyValue::ContextWord(context) | PropertyValue::ContextWords(context) => {
                fields.push(escape(&context.field));
                fields.push(sensitivity_code(context.sensitivity).to_string());
                for term_id in context.term_ids.iter() {
                    fields.push(escape(&self.index.term_string(&context.field, *term_id)?));
                }
            }
            PropertyValue::Decade(year) => fields.push(year.to_string()),
            PropertyValue::Int(value) => fields.push(value.to_string()),
            PropertyValue::Str(value) => fields.push(escape(value)),
            PropertyValue::Multiple(values) => {
                let mut parts = Vec::new();
                self.serialize_parts(values, &mut parts)?;
                return Ok(parts.join(&COMPOSITE_SEPARATOR.to_string()));
            }
        }
        Ok(fields.join(&SEPARATOR.to_string()))
    }

    /// Parses a value; returns `None` if the value is malformed or refers to
    /// terms unknown in the segment
    pub fn deserialize(&self, serialized: &str) -> Option<PropertyValue> {
        let mut parts = serialized.split(COMPOSITE_SEPARATOR);
        if parts.next() == Some(MULTIPLE_MARKER) {
            return parts
                .map(|part| self.deserialize_single(part))
                .collect::<Option<Vec<_>>>()
                .map(PropertyValue::Multiple);
        }
        self.deserialize_single(serialized)
    }

    fn deserialize_single(&self, serialized: &str) -> Option<PropertyValue> {
        let fields: Vec<&str> = serialized.split(SEPARATOR).collect();
        let value = match (fields[0], &fields[1..]) {
            ("cwo", [field, sensitivity, term]) => {
                PropertyValue::ContextWord(self.context_terms(field, sensitivity, &[*term])?)
            }
            ("cws", [field, sensitivity, terms @ ..]) => {
                PropertyValue::ContextWords(self.context_terms(field, sensitivity, terms)?)
            }
            ("dec", [year]) => PropertyValue::decade(year.parse().ok()?),
            ("int", [value]) => PropertyValue::Int(value.parse().ok()?),
            ("str", [value]) => PropertyValue::Str(unescape(value)?),
            (tag, _) => {
                debug!("Cannot parse property value {:?} (tag {})", serialized, tag);
                return None;
            }
        };
        Some(value)
    }

    fn context_terms(
        &self,
        field: &str,
        sensitivity: &str,
        terms: &[&str],
    ) -> Option<ContextTerms> {
        let field = unescape(field)?;
        let sensitivity = match sensitivity {
            "s" => Sensitivity::Sensitive,
            "i" => Sensitivity::Insensitive,
            other => {
                debug!("Unknown sensitivity {}", other);
                return None;
            }
        };

        let mut term_ids = Vec::with_capacity(terms.len());
        for term in terms {
            let term = unescape(term)?;
            match self.index.resolve_term_id(&field, &term) {
                Ok(Some(term_id)) => term_ids.push(term_id),
                Ok(None) => {
                    debug!("Term {:?} is not in field {} of this segment", term, field);
                    return None;
                }
                Err(e) => {
                    debug!("Cannot resolve term {:?}: {}", term, e);
                    return None;
                }
            }
        }

        Some(ContextTerms {
            field,
            sensitivity,
            term_ids,
        })
    }

    pub fn compare(&self, left: &PropertyValue, right: &PropertyValue) -> Result<Ordering> {
        use PropertyValue::*;
        Ok(match (left, right) {
            (ContextWord(a), ContextWord(b)) | (ContextWords(a), ContextWords(b)) => {
                self.compare_terms(a, b)?
            }
            (Decade(a), Decade(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Str(a), Str(b)) => {
                let insensitive = self.collators.get(Sensitivity::Insensitive);
                insensitive
                    .compare(a, b)
                    .then_with(|| self.collators.get(Sensitivity::Sensitive).compare(a, b))
            }
            (Multiple(a), Multiple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ordering = self.compare(x, y)?;
                    if ordering != Ordering::Equal {
                        return Ok(ordering);
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => a.rank().cmp(&b.rank()),
        })
    }

    /// Compares term sequences through the sort positions of the terms
    fn compare_terms(&self, left: &ContextTerms, right: &ContextTerms) -> Result<Ordering> {
        if left.field != right.field {
            return Ok(left.field.cmp(&right.field));
        }

        let case_sensitive = left.sensitivity.is_sensitive();
        for (a, b) in left.term_ids.iter().zip(right.term_ids.iter()) {
            let a = self.index.sort_position(&left.field, *a, case_sensitive)?;
            let b = self.index.sort_position(&left.field, *b, case_sensitive)?;
            if a != b {
                return Ok(a.cmp(&b));
            }
        }
        Ok(left.term_ids.len().cmp(&right.term_ids.len()))
    }
}
