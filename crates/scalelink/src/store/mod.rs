//! Persistence seams
//!
//! - **ChangeLogStore**: pending/delivered change log entries
//! - **CatalogStore**: scale systems, products, groups and keypad slots
//!
//! [`MemoryStore`] backs tests and dry runs, [`PgStore`] production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use scalelink_common::Result;

use crate::delivery::keymap::SlotQuery;
use crate::models::{ChangeLogEntry, Product, ScaleGroup, ScaleSystem};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Change log persistence
#[async_trait]
pub trait ChangeLogStore: Send + Sync {
    /// Insert a new entry; the store assigns the id, which is returned
    async fn record(&self, entry: ChangeLogEntry) -> Result<i64>;

    /// Replace the cached texts of an existing entry
    async fn update_texts(&self, entry: &ChangeLogEntry) -> Result<()>;

    /// Entries with `sent = false`, oldest `log_date` first, then by id
    async fn pending_entries(&self) -> Result<Vec<ChangeLogEntry>>;

    /// Entries with the given ids, in pending order. Unknown ids are ignored.
    async fn entries_by_ids(&self, ids: &[i64]) -> Result<Vec<ChangeLogEntry>>;

    async fn pending_count(&self) -> Result<u64>;

    /// Flag `ids` as sent at `sent_at`, all or nothing.
    ///
    /// Only entries still pending are touched; the number actually flagged
    /// is returned.
    async fn mark_sent(&self, ids: &[i64], sent_at: DateTime<Utc>) -> Result<u64>;
}

/// Read access to the catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Scale system with its product lines in output order
    async fn scale_system(&self, id: i64) -> Result<ScaleSystem>;

    async fn product(&self, id: i64) -> Result<Product>;

    async fn scale_group(&self, id: i64) -> Result<ScaleGroup>;

    /// Keypad slots held by active, saleable products outside the
    /// excluded group
    async fn occupied_slots(&self, query: &SlotQuery) -> Result<BTreeSet<u32>>;
}
