//! Batch aggregator
//!
//! Groups pending change log entries by scale system and gathers what must
//! be uploaded for each system.

use crate::models::{ChangeLogEntry, ScaleSystem};

/// Image upload queued for one entry and one image column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePush {
    pub product_id: i64,
    /// Product field holding the payload
    pub field_name: Option<String>,
    pub suffix: String,
}

/// Everything delivered to one scale system in one cycle
#[derive(Debug, Clone)]
pub struct Bucket {
    pub system: ScaleSystem,
    pub entries: Vec<ChangeLogEntry>,
    pub product_lines: Vec<String>,
    pub external_lines: Vec<String>,
    pub image_pushes: Vec<ImagePush>,
}

impl Bucket {
    /// Collect the text lines and image pushes of `entries`, keeping their order
    pub fn assemble(system: ScaleSystem, entries: Vec<ChangeLogEntry>) -> Self {
        let mut product_lines = Vec::new();
        let mut external_lines = Vec::new();
        let mut image_pushes = Vec::new();

        for entry in &entries {
            if !entry.product_text.is_empty() {
                product_lines.push(entry.product_text.clone());
            }
            if !entry.external_text.is_empty() {
                external_lines.push(entry.external_text.clone());
            }
            if system.send_images {
                // One push per image column, duplicates included.
                for line in system.image_lines() {
                    image_pushes.push(ImagePush {
                        product_id: entry.product_id,
                        field_name: line.field_name.clone(),
                        suffix: line.image_suffix().to_string(),
                    });
                }
            }
        }

        Self {
            system,
            entries,
            product_lines,
            external_lines,
            image_pushes,
        }
    }

    pub fn entry_ids(&self) -> Vec<i64> {
        self.entries.iter().map(|entry| entry.id).collect()
    }
}

/// Split entries per scale system.
///
/// Systems come out in order of first appearance; inside a group the input
/// order is kept.
pub fn group_by_system(entries: Vec<ChangeLogEntry>) -> Vec<(i64, Vec<ChangeLogEntry>)> {
    let mut groups: Vec<(i64, Vec<ChangeLogEntry>)> = Vec::new();
    for entry in entries {
        match groups
            .iter_mut()
            .find(|(system_id, _)| *system_id == entry.scale_system_id)
        {
            Some((_, bucket)) => bucket.push(entry),
            None => groups.push((entry.scale_system_id, vec![entry])),
        }
    }
    groups
}
