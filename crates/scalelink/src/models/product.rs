//! Catalog products and scale groups

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::value::FieldValue;

static EMPTY: FieldValue = FieldValue::Empty;

/// A catalog product as seen by the encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub scale_group_id: Option<i64>,
    /// Keypad slot assigned on the scale, if any
    pub scale_sequence: Option<u32>,
    pub active: bool,
    pub sale_ok: bool,
    /// Every other catalog field, addressed by line definitions
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            scale_group_id: None,
            scale_sequence: None,
            active: true,
            sale_ok: true,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_group(mut self, group_id: i64) -> Self {
        self.scale_group_id = Some(group_id);
        self
    }

    pub fn with_sequence(mut self, slot: u32) -> Self {
        self.scale_sequence = Some(slot);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Value of `name`, [`FieldValue::Empty`] when the product has no such field
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&EMPTY)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Image payload stored under `name`, if non-empty
    pub fn image(&self, name: &str) -> Option<&[u8]> {
        match self.field(name) {
            FieldValue::Image(bytes) if !bytes.is_empty() => Some(bytes),
            _ => None,
        }
    }
}

/// Group of products sharing a scale system; stamps satellite records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleGroup {
    pub id: i64,
    pub name: String,
    /// Identity code written in the second column of external text lines
    pub external_identity: String,
    pub scale_system_id: i64,
}
