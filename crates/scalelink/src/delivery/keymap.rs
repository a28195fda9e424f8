//! Key map generator
//!
//! The keypad of a scale exposes a fixed range of slots. The key file maps
//! every slot either to the product assigned to it (whose number is the
//! slot itself) or to article `9999`, which must not exist on the scale.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use scalelink_common::TextEncoding;

pub const FIRST_KEY_SLOT: u32 = 281;
pub const LAST_KEY_SLOT: u32 = 980;
pub const UNASSIGNED_SLOT_ARTICLE: u32 = 9999;
/// Scale group never mapped on the keypad
pub const DEFAULT_EXCLUDED_GROUP_ID: i64 = 7;

const KEY_DELIMITER: &str = "#";
const KEY_LEVEL: &str = "0001";

/// Parameters of the catalog slot query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotQuery {
    pub first_slot: u32,
    pub last_slot: u32,
    pub excluded_group_id: i64,
}

impl Default for SlotQuery {
    fn default() -> Self {
        Self {
            first_slot: FIRST_KEY_SLOT,
            last_slot: LAST_KEY_SLOT,
            excluded_group_id: DEFAULT_EXCLUDED_GROUP_ID,
        }
    }
}

impl SlotQuery {
    pub fn slots(&self) -> RangeInclusive<u32> {
        self.first_slot..=self.last_slot
    }
}

/// One line per slot of the range, terminator included
pub fn key_map_lines(
    query: &SlotQuery,
    occupied: &BTreeSet<u32>,
    encoding: TextEncoding,
) -> Vec<String> {
    let terminator = encoding.line_terminator();
    query
        .slots()
        .map(|slot| {
            let article = if occupied.contains(&slot) {
                slot
            } else {
                UNASSIGNED_SLOT_ARTICLE
            };
            format!("{slot}{KEY_DELIMITER}{KEY_LEVEL}{KEY_DELIMITER}{article}{terminator}")
        })
        .collect()
}

/// Key file pattern derived from the product text pattern
pub fn key_file_pattern(product_text_pattern: &str) -> String {
    product_text_pattern.replace("ARTI", "KEYS")
}
