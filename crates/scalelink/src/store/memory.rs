//! In-memory store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use scalelink_common::{Result, ScaleError};

use super::{CatalogStore, ChangeLogStore};
use crate::delivery::keymap::SlotQuery;
use crate::models::{ChangeLogEntry, Product, ScaleGroup, ScaleSystem};

#[derive(Debug, Default)]
struct State {
    systems: BTreeMap<i64, ScaleSystem>,
    products: BTreeMap<i64, Product>,
    groups: BTreeMap<i64, ScaleGroup>,
    entries: BTreeMap<i64, ChangeLogEntry>,
    next_entry_id: i64,
}

/// Catalog and change log held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| ScaleError::database("memory store lock poisoned"))
    }

    pub fn insert_system(&self, system: ScaleSystem) -> Result<()> {
        self.lock()?.systems.insert(system.id, system);
        Ok(())
    }

    pub fn insert_product(&self, product: Product) -> Result<()> {
        self.lock()?.products.insert(product.id, product);
        Ok(())
    }

    pub fn insert_group(&self, group: ScaleGroup) -> Result<()> {
        self.lock()?.groups.insert(group.id, group);
        Ok(())
    }

    /// Snapshot of one entry
    pub fn entry(&self, id: i64) -> Result<Option<ChangeLogEntry>> {
        Ok(self.lock()?.entries.get(&id).cloned())
    }

    /// Snapshot of every entry, by id
    pub fn entries(&self) -> Result<Vec<ChangeLogEntry>> {
        Ok(self.lock()?.entries.values().cloned().collect())
    }
}

fn pending_order(entries: &mut [ChangeLogEntry]) {
    entries.sort_by(|a, b| a.log_date.cmp(&b.log_date).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl ChangeLogStore for MemoryStore {
    async fn record(&self, mut entry: ChangeLogEntry) -> Result<i64> {
        let mut state = self.lock()?;
        state.next_entry_id += 1;
        entry.id = state.next_entry_id;
        let id = entry.id;
        state.entries.insert(id, entry);
        Ok(id)
    }

    async fn update_texts(&self, entry: &ChangeLogEntry) -> Result<()> {
        let mut state = self.lock()?;
        let stored = state
            .entries
            .get_mut(&entry.id)
            .ok_or_else(|| ScaleError::not_found(format!("change log entry {}", entry.id)))?;
        stored.product_text = entry.product_text.clone();
        stored.external_text = entry.external_text.clone();
        stored.external_text_display = entry.external_text_display.clone();
        Ok(())
    }

    async fn pending_entries(&self) -> Result<Vec<ChangeLogEntry>> {
        let mut pending: Vec<ChangeLogEntry> = self
            .lock()?
            .entries
            .values()
            .filter(|entry| !entry.sent)
            .cloned()
            .collect();
        pending_order(&mut pending);
        Ok(pending)
    }

    async fn entries_by_ids(&self, ids: &[i64]) -> Result<Vec<ChangeLogEntry>> {
        let state = self.lock()?;
        let mut selected: Vec<ChangeLogEntry> = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| state.entries.get(id).cloned())
            .collect();
        pending_order(&mut selected);
        Ok(selected)
    }

    async fn pending_count(&self) -> Result<u64> {
        Ok(self.lock()?.entries.values().filter(|entry| !entry.sent).count() as u64)
    }

    async fn mark_sent(&self, ids: &[i64], sent_at: DateTime<Utc>) -> Result<u64> {
        let mut state = self.lock()?;
        let mut marked = 0;
        for id in ids {
            if let Some(entry) = state.entries.get_mut(id) {
                if !entry.sent {
                    entry.sent = true;
                    entry.last_send_date = Some(sent_at);
                    marked += 1;
                }
            }
        }
        Ok(marked)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn scale_system(&self, id: i64) -> Result<ScaleSystem> {
        self.lock()?
            .systems
            .get(&id)
            .cloned()
            .ok_or_else(|| ScaleError::not_found(format!("scale system {}", id)))
    }

    async fn product(&self, id: i64) -> Result<Product> {
        self.lock()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| ScaleError::not_found(format!("product {}", id)))
    }

    async fn scale_group(&self, id: i64) -> Result<ScaleGroup> {
        self.lock()?
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| ScaleError::not_found(format!("scale group {}", id)))
    }

    async fn occupied_slots(&self, query: &SlotQuery) -> Result<BTreeSet<u32>> {
        let slots = query.slots();
        Ok(self
            .lock()?
            .products
            .values()
            .filter(|p| p.active && p.sale_ok)
            .filter(|p| matches!(p.scale_group_id, Some(group) if group != query.excluded_group_id))
            .filter_map(|p| p.scale_sequence)
            .filter(|slot| slots.contains(slot))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::Action;
    use chrono::TimeZone;

    fn pending(system_id: i64, product_id: i64, second: u32) -> ChangeLogEntry {
        ChangeLogEntry {
            id: 0,
            log_date: Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, second).unwrap(),
            action: Action::Create,
            scale_system_id: system_id,
            product_id,
            product_text: format!("C#{}\n", product_id),
            external_text: String::new(),
            external_text_display: String::new(),
            sent: false,
            last_send_date: None,
        }
    }

    #[tokio::test]
    async fn test_pending_entries_sorted_by_date() {
        let store = MemoryStore::new();
        let late = store.record(pending(1, 10, 30)).await.unwrap();
        let early = store.record(pending(1, 11, 5)).await.unwrap();

        let ids: Vec<i64> = store.pending_entries().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early, late]);
        assert_eq!(store.pending_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_sent_skips_already_sent() {
        let store = MemoryStore::new();
        let a = store.record(pending(1, 10, 0)).await.unwrap();
        let b = store.record(pending(1, 11, 1)).await.unwrap();
        let now = Utc::now();

        assert_eq!(store.mark_sent(&[a], now).await.unwrap(), 1);
        assert_eq!(store.mark_sent(&[a, b], now).await.unwrap(), 1);
        assert_eq!(store.pending_count().await.unwrap(), 0);
        assert_eq!(store.entry(a).unwrap().unwrap().last_send_date, Some(now));
    }

    #[tokio::test]
    async fn test_occupied_slots_filters_catalog() {
        let store = MemoryStore::new();
        store.insert_product(Product::new(1, "Apple").with_group(2).with_sequence(300)).unwrap();
        store.insert_product(Product::new(2, "Pear").with_group(7).with_sequence(301)).unwrap();
        store.insert_product(Product::new(3, "Plum").with_sequence(302)).unwrap();
        store.insert_product(Product::new(4, "Fig").with_group(2).with_sequence(999)).unwrap();
        let mut inactive = Product::new(5, "Lime").with_group(2).with_sequence(303);
        inactive.active = false;
        store.insert_product(inactive).unwrap();

        let slots = store.occupied_slots(&SlotQuery::default()).await.unwrap();
        assert_eq!(slots.into_iter().collect::<Vec<_>>(), vec![300]);
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.product(9).await, Err(ScaleError::NotFound(_))));
        assert!(matches!(store.scale_system(9).await, Err(ScaleError::NotFound(_))));
    }
}
