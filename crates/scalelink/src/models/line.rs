//! Line field definitions
//!
//! A scale system owns an ordered list of definitions; each one renders a
//! single column of the product record.

use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_SUFFIX: &str = ".PNG";

/// How a definition turns a value into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFieldType {
    Id,
    Numeric,
    Text,
    ExternalText,
    Constant,
    ExternalConstant,
    Many2one,
    Many2many,
    ProductImage,
}

impl LineFieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            LineFieldType::Id => "id",
            LineFieldType::Numeric => "numeric",
            LineFieldType::Text => "text",
            LineFieldType::ExternalText => "external_text",
            LineFieldType::Constant => "constant",
            LineFieldType::ExternalConstant => "external_constant",
            LineFieldType::Many2one => "many2one",
            LineFieldType::Many2many => "many2many",
            LineFieldType::ProductImage => "product_image",
        }
    }
}

impl std::str::FromStr for LineFieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(LineFieldType::Id),
            "numeric" => Ok(LineFieldType::Numeric),
            "text" => Ok(LineFieldType::Text),
            "external_text" => Ok(LineFieldType::ExternalText),
            "constant" => Ok(LineFieldType::Constant),
            "external_constant" => Ok(LineFieldType::ExternalConstant),
            "many2one" => Ok(LineFieldType::Many2one),
            "many2many" => Ok(LineFieldType::Many2many),
            "product_image" => Ok(LineFieldType::ProductImage),
            other => Err(format!("unknown line field type '{}'", other)),
        }
    }
}

/// One column of a scale system's product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFieldDefinition {
    pub id: i64,
    pub name: String,
    /// Short scale column code (`ABEZ`, `EAN1`, ...)
    pub code: Option<String>,
    pub field_type: LineFieldType,
    /// Product field read by this column
    pub field_name: Option<String>,
    /// Written after the fragment; never appears inside it
    pub delimiter: Option<char>,
    pub multiline_length: Option<usize>,
    pub multiline_separator: Option<String>,
    pub numeric_coefficient: f64,
    /// Decimal digits kept by numeric columns
    pub numeric_round: u32,
    pub constant_value: Option<String>,
    /// Field read on the related record (many2one / many2many)
    pub related_field_name: Option<String>,
    /// 1-based position picked from a many2many value
    pub x2many_range: usize,
    pub suffix: Option<String>,
}

impl LineFieldDefinition {
    pub fn new(id: i64, field_type: LineFieldType) -> Self {
        Self {
            id,
            name: format!("{}-{}", field_type.as_str(), id),
            code: None,
            field_type,
            field_name: None,
            delimiter: None,
            multiline_length: None,
            multiline_separator: None,
            numeric_coefficient: 1.0,
            numeric_round: 2,
            constant_value: None,
            related_field_name: None,
            x2many_range: 1,
            suffix: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_multiline(mut self, length: usize, separator: impl Into<String>) -> Self {
        self.multiline_length = Some(length);
        self.multiline_separator = Some(separator.into());
        self
    }

    pub fn with_numeric(mut self, coefficient: f64, round: u32) -> Self {
        self.numeric_coefficient = coefficient;
        self.numeric_round = round;
        self
    }

    pub fn with_constant(mut self, value: impl Into<String>) -> Self {
        self.constant_value = Some(value.into());
        self
    }

    pub fn with_related_field(mut self, related: impl Into<String>) -> Self {
        self.related_field_name = Some(related.into());
        self
    }

    pub fn with_range(mut self, position: usize) -> Self {
        self.x2many_range = position;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    /// Image file extension, `.PNG` when unset
    pub fn image_suffix(&self) -> &str {
        match self.suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => suffix,
            _ => DEFAULT_IMAGE_SUFFIX,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_round_trips_through_str() {
        for name in ["id", "numeric", "external_constant", "many2many", "product_image"] {
            let parsed: LineFieldType = name.parse().unwrap();
            assert_eq!(parsed.as_str(), name);
        }
        assert!("barcode".parse::<LineFieldType>().is_err());
    }

    #[test]
    fn test_image_suffix_default() {
        let def = LineFieldDefinition::new(1, LineFieldType::ProductImage);
        assert_eq!(def.image_suffix(), ".PNG");
        assert_eq!(def.clone().with_suffix("").image_suffix(), ".PNG");
        assert_eq!(def.with_suffix(".JPG").image_suffix(), ".JPG");
    }
}
