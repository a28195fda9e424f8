//! Record builder
//!
//! Builds the primary record and the satellite (external text) records of
//! one change log entry in two passes:
//!
//! 1. every definition is encoded, in order, into pieces plus an optional
//!    satellite line;
//! 2. pieces are concatenated. A barcode base placeholder takes the value
//!    of the first `EAN1` column that comes *after* it; with no such column
//!    the raw `%BARCODEBASE%` token stays in the record.

use crate::models::{Action, ChangeLogEntry, Product, ScaleGroup, ScaleSystem};

use super::field::{
    encode_field, strip_delimiter, EncodeContext, EncodedField, Piece, Placeholder,
    BARCODE_BASE_TOKEN,
};

/// Separator between the action code and the first column
pub const RECORD_DELIMITER: char = '#';

/// Texts cached on a change log entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedRecord {
    pub product_text: String,
    pub external_text: String,
    pub external_text_display: String,
}

impl EncodedRecord {
    pub fn apply_to(self, entry: &mut ChangeLogEntry) {
        entry.product_text = self.product_text;
        entry.external_text = self.external_text;
        entry.external_text_display = self.external_text_display;
    }
}

/// Encode `product` with the layout of `system`
pub fn build_record(
    action: Action,
    system: &ScaleSystem,
    product: &Product,
    group: Option<&ScaleGroup>,
) -> EncodedRecord {
    let ctx = EncodeContext { product, group };
    let terminator = system.line_terminator();

    let fields: Vec<EncodedField> = system
        .product_lines
        .iter()
        .map(|definition| encode_field(definition, &ctx))
        .collect();

    let mut product_text = String::new();
    product_text.push(action.code());
    product_text.push(RECORD_DELIMITER);

    for (index, (field, definition)) in fields.iter().zip(&system.product_lines).enumerate() {
        for piece in &field.pieces {
            match piece {
                Piece::Literal(text) => product_text.push_str(text),
                Piece::Placeholder(Placeholder::BarcodeBase) => {
                    match barcode_base_after(&fields[index + 1..]) {
                        Some(base) => {
                            // The " - " separator is part of the label format
                            product_text.push_str(&strip_delimiter(base.to_string(), definition));
                            product_text.push_str(" - ");
                        },
                        None => product_text.push_str(BARCODE_BASE_TOKEN),
                    }
                },
            }
        }
        if let Some(delimiter) = definition.delimiter {
            product_text.push(delimiter);
        }
    }
    product_text.push_str(terminator);

    let satellites: Vec<&str> = fields
        .iter()
        .filter_map(|field| field.satellite.as_deref())
        .collect();

    let mut external_text = satellites.join(terminator);
    external_text.push_str(terminator);

    let external_text_display = satellites
        .iter()
        .map(|line| line.replace(['\r', '\n'], ""))
        .collect::<Vec<_>>()
        .join("\n");

    EncodedRecord {
        product_text,
        external_text,
        external_text_display,
    }
}

fn barcode_base_after(fields: &[EncodedField]) -> Option<&str> {
    fields.iter().find_map(|field| field.barcode_base.as_deref())
}
