//! Change log service
//!
//! Records product changes per scale system with their texts computed from
//! the current catalog state. Texts are cached on the entry; delivery never
//! re-encodes.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use scalelink_common::{Result, ScaleError};

use crate::encode::build_record;
use crate::models::{Action, ChangeLogEntry, Product, ScaleGroup};
use crate::store::{CatalogStore, ChangeLogStore};

pub struct ChangeLog<S> {
    store: Arc<S>,
}

impl<S> ChangeLog<S>
where
    S: ChangeLogStore + CatalogStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Encode `product_id` for `system_id` and store a pending entry
    pub async fn record_change(
        &self,
        action: Action,
        product_id: i64,
        system_id: i64,
    ) -> Result<i64> {
        let system = self.store.scale_system(system_id).await?;
        let product = self.store.product(product_id).await?;
        let group = self.group_of(&product).await?;

        let record = build_record(action, &system, &product, group.as_ref());
        let mut entry = ChangeLogEntry {
            id: 0,
            log_date: Utc::now(),
            action,
            scale_system_id: system_id,
            product_id,
            product_text: String::new(),
            external_text: String::new(),
            external_text_display: String::new(),
            sent: false,
            last_send_date: None,
        };
        record.apply_to(&mut entry);

        let id = self.store.record(entry).await?;
        info!(
            entry_id = id,
            product_id,
            system_id,
            action = action.as_str(),
            "Recorded scale change"
        );
        Ok(id)
    }

    /// Recompute the cached texts of an entry from the current catalog
    pub async fn refresh(&self, entry_id: i64) -> Result<ChangeLogEntry> {
        let mut entry = self
            .store
            .entries_by_ids(&[entry_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScaleError::not_found(format!("change log entry {}", entry_id)))?;

        let system = self.store.scale_system(entry.scale_system_id).await?;
        let product = self.store.product(entry.product_id).await?;
        let group = self.group_of(&product).await?;

        build_record(entry.action, &system, &product, group.as_ref()).apply_to(&mut entry);
        self.store.update_texts(&entry).await?;
        debug!(entry_id, "Refreshed change log texts");
        Ok(entry)
    }

    /// Entries still waiting for delivery
    pub async fn pending_count(&self) -> Result<u64> {
        self.store.pending_count().await
    }

    async fn group_of(&self, product: &Product) -> Result<Option<ScaleGroup>> {
        let Some(group_id) = product.scale_group_id else {
            return Ok(None);
        };
        match self.store.scale_group(group_id).await {
            Ok(group) => Ok(Some(group)),
            Err(ScaleError::NotFound(_)) => {
                debug!(product_id = product.id, group_id, "Scale group not found");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }
}
