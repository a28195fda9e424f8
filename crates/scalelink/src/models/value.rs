//! Typed catalog values
//!
//! Line definitions address product data by field name. Instead of dynamic
//! attribute lookup every field resolves to a [`FieldValue`], and related
//! records expose the same [`RelatedRecord::field`] capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static EMPTY: FieldValue = FieldValue::Empty;

/// Value of one catalog field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Empty,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    /// many2one target
    Reference(RelatedRecord),
    /// many2many / one2many targets, in catalog order
    ReferenceList(Vec<RelatedRecord>),
    /// Raw image payload
    Image(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Catalog truthiness: empty text, zero, false, empty lists and empty
    /// images all count as "no value".
    pub fn is_set(&self) -> bool {
        match self {
            FieldValue::Empty => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Integer(i) => *i != 0,
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Reference(_) => true,
            FieldValue::ReferenceList(items) => !items.is_empty(),
            FieldValue::Image(bytes) => !bytes.is_empty(),
        }
    }

    /// Text rendering of a scalar value, `None` when unset or not scalar.
    pub fn to_text(&self) -> Option<String> {
        if !self.is_set() {
            return None;
        }
        match self {
            FieldValue::Bool(_) => Some("True".to_string()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Number(n) => Some(float_text(*n)),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Reference(record) => Some(record.id.to_string()),
            _ => None,
        }
    }

    /// Numeric view; unset values count as zero
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Empty | FieldValue::Bool(false) => Some(0.0),
            FieldValue::Bool(true) => Some(1.0),
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Empty => "empty",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::Reference(_) => "reference",
            FieldValue::ReferenceList(_) => "reference_list",
            FieldValue::Image(_) => "image",
        }
    }
}

/// Float rendering that always keeps a fractional part (`10.0`, `10.5`),
/// the form scale numeric columns are derived from.
///
/// Below `1e-4` and from `1e16` on the exponent form is used, with an
/// explicit sign and at least two exponent digits (`1e+16`, `1.5e-05`).
pub fn float_text(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let text = format!("{:?}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        },
        None => text,
    }
}

/// A record reached through a reference field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RelatedRecord {
    pub id: i64,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl RelatedRecord {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Value of `name`, [`FieldValue::Empty`] when the field does not exist
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&EMPTY)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.trim()).map_err(serde::de::Error::custom)
    }
}
