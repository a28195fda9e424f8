//! Field encoder
//!
//! Renders one line definition against one product. The output is a list
//! of pieces rather than a string: the `ABEZ` column carries a placeholder
//! that only the record builder can resolve, once the `EAN1` column that
//! follows it has been encoded.

use tracing::debug;

use crate::models::{
    FieldValue, LineFieldDefinition, LineFieldType, Product, RelatedRecord, ScaleGroup,
};

/// Column code whose fragment is prefixed with the barcode base
pub const BARCODE_BASE_TARGET_CODE: &str = "ABEZ";

/// Column code whose cleaned value provides the barcode base
pub const BARCODE_BASE_SOURCE_CODE: &str = "EAN1";

/// Text written for a barcode base placeholder that nothing resolved
pub const BARCODE_BASE_TOKEN: &str = "%BARCODEBASE%";

/// Action code of every external text line, whatever the entry action
pub const EXTERNAL_TEXT_ACTION_CODE: &str = "C";

pub const EXTERNAL_TEXT_DELIMITER: &str = "#";

/// Width of the zero-padded definition id inside generated external ids
pub const EXTERNAL_ID_WIDTH: usize = 4;

/// Named slot filled in by a later column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    BarcodeBase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Literal(String),
    Placeholder(Placeholder),
}

/// Encoder output for one definition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedField {
    pub pieces: Vec<Piece>,
    /// External text line produced alongside the fragment
    pub satellite: Option<String>,
    /// Set by `EAN1` columns: characters 4..7 of their cleaned value
    pub barcode_base: Option<String>,
}

impl EncodedField {
    fn literal(text: impl Into<String>) -> Self {
        Self {
            pieces: vec![Piece::Literal(text.into())],
            ..Self::default()
        }
    }

    fn empty() -> Self {
        Self::literal(String::new())
    }

    /// Fragment with unresolved placeholders written as their token
    pub fn text(&self) -> String {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Literal(text) => text.as_str(),
                Piece::Placeholder(Placeholder::BarcodeBase) => BARCODE_BASE_TOKEN,
            })
            .collect()
    }
}

/// What the encoder may look at besides the definition
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    pub product: &'a Product,
    /// Scale group of the product, source of the external identity
    pub group: Option<&'a ScaleGroup>,
}

/// Wrap and sanitize a text value.
///
/// Empty input gives empty output. With `multiline_length` set the value is
/// cut into chunks of that many characters joined by `multiline_separator`.
/// Every occurrence of the definition delimiter is then removed.
pub fn clean(value: &str, definition: &LineFieldDefinition) -> String {
    if value.is_empty() {
        return String::new();
    }

    let wrapped = match definition.multiline_length {
        Some(length) if length > 0 => {
            let separator = definition.multiline_separator.as_deref().unwrap_or("");
            let chars: Vec<char> = value.chars().collect();
            chars
                .chunks(length)
                .map(|chunk| chunk.iter().collect::<String>())
                .collect::<Vec<_>>()
                .join(separator)
        },
        _ => value.to_string(),
    };

    strip_delimiter(wrapped, definition)
}

fn clean_value(value: &FieldValue, definition: &LineFieldDefinition) -> String {
    clean(value.to_text().as_deref().unwrap_or(""), definition)
}

pub(crate) fn strip_delimiter(text: String, definition: &LineFieldDefinition) -> String {
    match definition.delimiter {
        Some(delimiter) if text.contains(delimiter) => text.replace(delimiter, ""),
        _ => text,
    }
}

fn defect(definition: &LineFieldDefinition, product: &Product, reason: &str) {
    debug!(
        line_id = definition.id,
        line = %definition.name,
        product_id = product.id,
        "Encoding defect, column left empty: {}",
        reason
    );
}

/// Product value read by the definition, `Empty` when unreachable
fn source_value<'a>(definition: &LineFieldDefinition, product: &'a Product) -> &'a FieldValue {
    match definition.field_name.as_deref() {
        Some(name) => {
            if !product.has_field(name) {
                defect(definition, product, &format!("product has no field '{}'", name));
            }
            product.field(name)
        },
        None => {
            defect(definition, product, "no source field configured");
            product.field("")
        },
    }
}

/// `{product id}{definition id padded to 4 digits}`
pub fn external_id(product_id: i64, definition_id: i64) -> String {
    format!(
        "{}{:0width$}",
        product_id,
        definition_id,
        width = EXTERNAL_ID_WIDTH
    )
}

/// `C#{group identity}#{external id}#{text}`
pub fn satellite_line(identity: &str, external_id: &str, text: &str) -> String {
    [EXTERNAL_TEXT_ACTION_CODE, identity, external_id, text].join(EXTERNAL_TEXT_DELIMITER)
}

fn group_identity<'a>(definition: &LineFieldDefinition, ctx: &EncodeContext<'a>) -> &'a str {
    match ctx.group {
        Some(group) => group.external_identity.as_str(),
        None => {
            defect(definition, ctx.product, "product has no scale group");
            ""
        },
    }
}

/// Image file name of a product for one image column
pub fn image_file_name(product_id: i64, suffix: &str) -> String {
    format!("{}{}", product_id, suffix)
}

/// Encode one definition for one product
pub fn encode_field(definition: &LineFieldDefinition, ctx: &EncodeContext<'_>) -> EncodedField {
    let product = ctx.product;

    match definition.field_type {
        LineFieldType::Id => EncodedField::literal(product.id.to_string()),

        LineFieldType::Numeric => {
            let value = source_value(definition, product);
            match value.as_number() {
                Some(number) => EncodedField::literal(strip_delimiter(
                    numeric_text(number, definition),
                    definition,
                )),
                None => {
                    defect(definition, product, &format!("{} is not numeric", value.kind()));
                    EncodedField::empty()
                },
            }
        },

        LineFieldType::Text => {
            let cleaned = clean_value(source_value(definition, product), definition);
            let mut field = EncodedField::default();
            if definition.has_code(BARCODE_BASE_TARGET_CODE) {
                field.pieces.push(Piece::Placeholder(Placeholder::BarcodeBase));
            }
            if definition.has_code(BARCODE_BASE_SOURCE_CODE) {
                field.barcode_base = Some(cleaned.chars().skip(4).take(3).collect());
            }
            field.pieces.push(Piece::Literal(cleaned));
            field
        },

        LineFieldType::ExternalText => {
            let text = clean_value(source_value(definition, product), definition);
            let id = external_id(product.id, definition.id);
            let satellite = satellite_line(group_identity(definition, ctx), &id, &text);
            EncodedField {
                satellite: Some(satellite),
                ..EncodedField::literal(id)
            }
        },

        LineFieldType::Constant => EncodedField::literal(clean(
            definition.constant_value.as_deref().unwrap_or(""),
            definition,
        )),

        LineFieldType::ExternalConstant => {
            let text = clean(definition.constant_value.as_deref().unwrap_or(""), definition);
            let id = definition.id.to_string();
            let satellite = satellite_line(group_identity(definition, ctx), &id, &text);
            EncodedField {
                satellite: Some(satellite),
                ..EncodedField::literal(id)
            }
        },

        LineFieldType::Many2one => match source_value(definition, product) {
            FieldValue::Reference(record) => {
                EncodedField::literal(many2one_text(record, definition, product))
            },
            value if !value.is_set() => EncodedField::empty(),
            value => {
                defect(definition, product, &format!("{} is not a reference", value.kind()));
                EncodedField::empty()
            },
        },

        LineFieldType::Many2many => match source_value(definition, product) {
            FieldValue::ReferenceList(items) => {
                EncodedField::literal(many2many_text(items, definition, product))
            },
            value if !value.is_set() => EncodedField::empty(),
            value => {
                defect(definition, product, &format!("{} is not a reference list", value.kind()));
                EncodedField::empty()
            },
        },

        LineFieldType::ProductImage => {
            let has_image = definition
                .field_name
                .as_deref()
                .and_then(|name| product.image(name))
                .is_some();
            if has_image {
                EncodedField::literal(image_file_name(product.id, definition.image_suffix()))
            } else {
                EncodedField::empty()
            }
        },
    }
}

/// `value x coefficient`, rounded, rendered as a float with the first
/// `.0` removed. `10.0` gives `10` but `10.05` gives `105`: scale files
/// have always been produced that way.
fn numeric_text(value: f64, definition: &LineFieldDefinition) -> String {
    let factor = 10f64.powi(definition.numeric_round.min(15) as i32);
    let rounded = (value * definition.numeric_coefficient * factor).round() / factor;
    crate::models::value::float_text(rounded).replacen(".0", "", 1)
}

fn many2one_text(
    record: &RelatedRecord,
    definition: &LineFieldDefinition,
    product: &Product,
) -> String {
    match definition.related_field_name.as_deref() {
        None => record.id.to_string(),
        Some(related) => {
            if !record.has_field(related) {
                defect(definition, product, &format!("related record has no field '{}'", related));
            }
            strip_delimiter(record.field(related).to_text().unwrap_or_default(), definition)
        },
    }
}

fn many2many_text(
    items: &[RelatedRecord],
    definition: &LineFieldDefinition,
    product: &Product,
) -> String {
    let position = definition.x2many_range;
    if position == 0 || position > items.len() {
        return String::new();
    }
    let item = &items[position - 1];
    let value = match definition.related_field_name.as_deref() {
        Some(related) => {
            if !item.has_field(related) {
                defect(definition, product, &format!("related record has no field '{}'", related));
            }
            item.field(related).to_text()
        },
        None => Some(item.id.to_string()),
    };
    clean(value.as_deref().unwrap_or(""), definition)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn group() -> ScaleGroup {
        ScaleGroup {
            id: 2,
            name: "Fruits".to_string(),
            external_identity: "12".to_string(),
            scale_system_id: 1,
        }
    }

    fn encode(definition: &LineFieldDefinition, product: &Product) -> EncodedField {
        let group = group();
        encode_field(
            definition,
            &EncodeContext {
                product,
                group: Some(&group),
            },
        )
    }

    #[test]
    fn test_clean_wraps_and_strips() {
        let def = LineFieldDefinition::new(1, LineFieldType::Text)
            .with_multiline(4, "|")
            .with_delimiter('#');
        assert_eq!(clean("Pomme#Gala", &def), "Pomm|eGal|a");
        assert_eq!(clean("", &def), "");
    }

    #[test]
    fn test_clean_without_wrap_keeps_value() {
        let def = LineFieldDefinition::new(1, LineFieldType::Text);
        assert_eq!(clean("Poire #1", &def), "Poire #1");
    }

    #[test]
    fn test_id() {
        let def = LineFieldDefinition::new(1, LineFieldType::Id);
        assert_eq!(encode(&def, &Product::new(42, "Kiwi")).text(), "42");
    }

    #[test]
    fn test_numeric_drops_trailing_zero() {
        let def = LineFieldDefinition::new(1, LineFieldType::Numeric)
            .with_field("list_price")
            .with_numeric(1.0, 2);
        let product = Product::new(1, "Kiwi").with_field("list_price", FieldValue::Number(10.0));
        assert_eq!(encode(&def, &product).text(), "10");

        let product = Product::new(1, "Kiwi").with_field("list_price", FieldValue::Number(10.5));
        assert_eq!(encode(&def, &product).text(), "10.5");
    }

    #[test]
    fn test_numeric_coefficient_and_rounding() {
        let def = LineFieldDefinition::new(1, LineFieldType::Numeric)
            .with_field("list_price")
            .with_numeric(100.0, 0);
        let product = Product::new(1, "Kiwi").with_field("list_price", FieldValue::Number(2.456));
        assert_eq!(encode(&def, &product).text(), "246");

        let product = Product::new(1, "Kiwi").with_field("list_price", FieldValue::Number(1e14));
        assert_eq!(encode(&def, &product).text(), "1e+16");
    }

    #[test]
    fn test_numeric_reproduces_inner_zero_truncation() {
        let def = LineFieldDefinition::new(1, LineFieldType::Numeric)
            .with_field("list_price")
            .with_numeric(1.0, 2);
        let product = Product::new(1, "Kiwi").with_field("list_price", FieldValue::Number(10.05));
        assert_eq!(encode(&def, &product).text(), "105");
    }

    #[test]
    fn test_numeric_unset_is_zero_and_text_is_defect() {
        let def = LineFieldDefinition::new(1, LineFieldType::Numeric).with_field("list_price");
        assert_eq!(encode(&def, &Product::new(1, "Kiwi")).text(), "0");

        let product = Product::new(1, "Kiwi").with_field("list_price", FieldValue::text("cheap"));
        assert_eq!(encode(&def, &product).text(), "");
    }

    #[test]
    fn test_external_text() {
        let def = LineFieldDefinition::new(7, LineFieldType::ExternalText)
            .with_field("ingredients")
            .with_delimiter('#');
        let product =
            Product::new(42, "Kiwi").with_field("ingredients", FieldValue::text("Kiwi #bio"));
        let field = encode(&def, &product);
        assert_eq!(field.text(), "420007");
        assert_eq!(field.satellite.as_deref(), Some("C#12#420007#Kiwi bio"));
    }

    #[test]
    fn test_external_constant_uses_definition_id() {
        let def = LineFieldDefinition::new(15, LineFieldType::ExternalConstant)
            .with_constant("Origine France");
        let field = encode(&def, &Product::new(42, "Kiwi"));
        assert_eq!(field.text(), "15");
        assert_eq!(field.satellite.as_deref(), Some("C#12#15#Origine France"));
    }

    #[test]
    fn test_external_text_without_group() {
        let def =
            LineFieldDefinition::new(3, LineFieldType::ExternalText).with_field("ingredients");
        let product = Product::new(5, "Kiwi").with_field("ingredients", FieldValue::text("Kiwi"));
        let field = encode_field(
            &def,
            &EncodeContext {
                product: &product,
                group: None,
            },
        );
        assert_eq!(field.satellite.as_deref(), Some("C##50003#Kiwi"));
    }

    #[test]
    fn test_constant() {
        let def = LineFieldDefinition::new(1, LineFieldType::Constant)
            .with_constant("X#Y")
            .with_delimiter('#');
        assert_eq!(encode(&def, &Product::new(1, "Kiwi")).text(), "XY");
    }

    #[test]
    fn test_many2one() {
        let uom = RelatedRecord::new(9).with_field("scale_code", FieldValue::text("KG"));
        let product = Product::new(1, "Kiwi").with_field("uom_id", FieldValue::Reference(uom));

        let by_id = LineFieldDefinition::new(1, LineFieldType::Many2one).with_field("uom_id");
        assert_eq!(encode(&by_id, &product).text(), "9");

        let related = by_id.clone().with_related_field("scale_code");
        assert_eq!(encode(&related, &product).text(), "KG");

        let falsy = by_id.with_related_field("missing");
        assert_eq!(encode(&falsy, &product).text(), "");

        let unset = LineFieldDefinition::new(1, LineFieldType::Many2one).with_field("categ_id");
        assert_eq!(encode(&unset, &product).text(), "");
    }

    #[test]
    fn test_many2many_selection() {
        let labels = vec![
            RelatedRecord::new(4).with_field("code", FieldValue::text("AB")),
            RelatedRecord::new(8).with_field("code", FieldValue::text("Bio#")),
        ];
        let product =
            Product::new(1, "Kiwi").with_field("label_ids", FieldValue::ReferenceList(labels));
        let def = LineFieldDefinition::new(1, LineFieldType::Many2many)
            .with_field("label_ids")
            .with_related_field("code")
            .with_delimiter('#');

        assert_eq!(encode(&def.clone().with_range(1), &product).text(), "AB");
        assert_eq!(encode(&def.clone().with_range(2), &product).text(), "Bio");
        assert_eq!(encode(&def.clone().with_range(3), &product).text(), "");
        assert_eq!(encode(&def.clone().with_range(0), &product).text(), "");

        let by_id = LineFieldDefinition::new(1, LineFieldType::Many2many)
            .with_field("label_ids")
            .with_range(2);
        assert_eq!(encode(&by_id, &product).text(), "8");
    }

    #[test]
    fn test_product_image() {
        let def = LineFieldDefinition::new(1, LineFieldType::ProductImage).with_field("image");
        let with_image =
            Product::new(42, "Kiwi").with_field("image", FieldValue::Image(vec![1, 2, 3]));
        assert_eq!(encode(&def, &with_image).text(), "42.PNG");
        assert_eq!(encode(&def.clone().with_suffix(".jpg"), &with_image).text(), "42.jpg");
        assert_eq!(encode(&def, &Product::new(42, "Kiwi")).text(), "");
    }

    #[test]
    fn test_barcode_columns() {
        let abez = LineFieldDefinition::new(1, LineFieldType::Text)
            .with_field("name")
            .with_code("ABEZ");
        let ean = LineFieldDefinition::new(2, LineFieldType::Text)
            .with_field("barcode")
            .with_code("EAN1");
        let product = Product::new(1, "Kiwi")
            .with_field("name", FieldValue::text("Kiwi"))
            .with_field("barcode", FieldValue::text("2100123000004"));

        let field = encode(&abez, &product);
        assert_eq!(
            field.pieces,
            vec![
                Piece::Placeholder(Placeholder::BarcodeBase),
                Piece::Literal("Kiwi".to_string())
            ]
        );
        assert_eq!(field.text(), "%BARCODEBASE%Kiwi");

        let field = encode(&ean, &product);
        assert_eq!(field.barcode_base.as_deref(), Some("123"));
        assert_eq!(field.text(), "2100123000004");
    }

    #[test]
    fn test_missing_source_field_degrades() {
        let def = LineFieldDefinition::new(1, LineFieldType::Text);
        assert_eq!(encode(&def, &Product::new(1, "Kiwi")).text(), "");
    }

    proptest! {
        #[test]
        fn prop_text_fragment_never_contains_delimiter(value in ".{0,40}", wrap in 0usize..6) {
            let mut def = LineFieldDefinition::new(1, LineFieldType::Text)
                .with_field("name")
                .with_delimiter('#');
            if wrap > 0 {
                def = def.with_multiline(wrap, "#");
            }
            let product = Product::new(1, "Kiwi").with_field("name", FieldValue::text(value));
            prop_assert!(!encode(&def, &product).text().contains('#'));
        }

        #[test]
        fn prop_clean_is_idempotent(value in "[a-z#]{0,30}") {
            let def = LineFieldDefinition::new(1, LineFieldType::Text).with_delimiter('#');
            let once = clean(&value, &def);
            prop_assert_eq!(clean(&once, &def), once);
        }

        #[test]
        fn prop_multiline_chunks(chunk in 1usize..8, count in 1usize..6) {
            let def = LineFieldDefinition::new(1, LineFieldType::Text).with_multiline(chunk, "/");
            let value = "x".repeat(chunk * count);
            let wrapped = clean(&value, &def);
            let parts: Vec<&str> = wrapped.split('/').collect();
            prop_assert_eq!(parts.len(), count);
            prop_assert!(parts.iter().all(|p| p.chars().count() == chunk));
            prop_assert_eq!(wrapped.matches('/').count(), count - 1);
        }
    }
}
