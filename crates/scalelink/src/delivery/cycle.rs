//! Delivery cycle
//!
//! One cycle pulls the entries to deliver once, splits them per scale
//! system and delivers each bucket in turn:
//!
//! 1. open a session
//! 2. product images
//! 3. external text file
//! 4. product text file
//! 5. key file
//! 6. close the session
//! 7. mark the bucket's entries as sent
//!
//! A failing bucket is logged and left pending; the other buckets are
//! still attempted. Cycles never overlap inside one process.

use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use scalelink_common::{Result, ScaleError};

use super::batch::{group_by_system, Bucket};
use super::keymap::{key_file_pattern, key_map_lines, SlotQuery};
use super::ledger::mark_sent;
use super::push::{push_image, push_text, PushSettings};
use super::transport::{close_session, Transport, TransportSession};
use crate::models::ChangeLogEntry;
use crate::store::{CatalogStore, ChangeLogStore};

/// Local settings shared by every bucket
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub push: PushSettings,
    pub slot_query: SlotQuery,
}

/// Outcome of one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Another cycle held the run lock; nothing was done
    pub skipped: bool,
    pub delivered_systems: Vec<i64>,
    /// Scale system id and error message of every failed bucket
    pub failed_systems: Vec<(i64, String)>,
    pub entries_marked: u64,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_systems.is_empty()
    }
}

/// Delivers change log entries to scale systems
pub struct DeliveryCycle<S, T> {
    store: Arc<S>,
    transport: T,
    settings: DeliverySettings,
    run_lock: Mutex<()>,
}

impl<S, T> DeliveryCycle<S, T>
where
    S: ChangeLogStore + CatalogStore,
    T: Transport,
{
    pub fn new(store: Arc<S>, transport: T, settings: DeliverySettings) -> Self {
        Self {
            store,
            transport,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    /// Deliver every pending entry
    pub async fn run(&self) -> Result<CycleReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            info!("Delivery cycle already running, skipping");
            return Ok(CycleReport::skipped());
        };

        info!("Starting delivery cycle");
        let entries = self.store.pending_entries().await?;
        Ok(self.deliver(entries).await)
    }

    /// Deliver the selected entries, whether already sent or not
    pub async fn send_entries(&self, entry_ids: &[i64]) -> Result<CycleReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            info!("Delivery cycle already running, skipping manual send");
            return Ok(CycleReport::skipped());
        };

        info!("Sending {} selected change log entries", entry_ids.len());
        let entries = self.store.entries_by_ids(entry_ids).await?;
        Ok(self.deliver(entries).await)
    }

    async fn deliver(&self, entries: Vec<ChangeLogEntry>) -> CycleReport {
        let mut report = CycleReport::default();
        if entries.is_empty() {
            info!("No change log entries to deliver");
            return report;
        }

        for (system_id, entries) in group_by_system(entries) {
            match self.deliver_system(system_id, entries).await {
                Ok(marked) => {
                    report.delivered_systems.push(system_id);
                    report.entries_marked += marked;
                },
                Err(e) => {
                    error!("Delivery to scale system {} failed: {}", system_id, e);
                    report.failed_systems.push((system_id, e.to_string()));
                },
            }
        }

        info!(
            "Delivery cycle completed: {} systems delivered, {} failed, {} entries marked",
            report.delivered_systems.len(),
            report.failed_systems.len(),
            report.entries_marked
        );
        report
    }

    async fn deliver_system(&self, system_id: i64, entries: Vec<ChangeLogEntry>) -> Result<u64> {
        let system = self.store.scale_system(system_id).await?;
        let bucket = Bucket::assemble(system, entries);
        info!(
            "Delivering {} entries to scale system '{}' ({})",
            bucket.entries.len(),
            bucket.system.name,
            bucket.system.ftp.display_target()
        );

        let now = Local::now();
        let mut session = self.transport.open(&bucket.system.ftp).await?;
        let pushed = self.push_bucket(session.as_mut(), &bucket, &now).await;
        close_session(session).await;
        pushed?;

        let sent_at: DateTime<Utc> = now.with_timezone(&Utc);
        mark_sent(self.store.as_ref(), &bucket.entry_ids(), sent_at).await
    }

    async fn push_bucket(
        &self,
        session: &mut dyn TransportSession,
        bucket: &Bucket,
        now: &DateTime<Local>,
    ) -> Result<()> {
        let system = &bucket.system;
        let push = &self.settings.push;

        for image in &bucket.image_pushes {
            let product = match self.store.product(image.product_id).await {
                Ok(product) => product,
                Err(ScaleError::NotFound(_)) => {
                    debug!(product_id = image.product_id, "Product gone, no image to send");
                    continue;
                },
                Err(e) => return Err(e),
            };
            push_image(
                session,
                push,
                &system.product_image_relative_path,
                &product,
                image.field_name.as_deref(),
                &image.suffix,
            )
            .await?;
        }

        push_text(
            session,
            push,
            &system.csv_relative_path,
            &system.external_text_file_pattern,
            &bucket.external_lines,
            system.encoding,
            now,
        )
        .await?;
        push_text(
            session,
            push,
            &system.csv_relative_path,
            &system.product_text_file_pattern,
            &bucket.product_lines,
            system.encoding,
            now,
        )
        .await?;

        let occupied = self.store.occupied_slots(&self.settings.slot_query).await?;
        let key_lines = key_map_lines(&self.settings.slot_query, &occupied, system.encoding);
        push_text(
            session,
            push,
            &system.csv_relative_path,
            &key_file_pattern(&system.product_text_file_pattern),
            &key_lines,
            system.encoding,
            now,
        )
        .await?;

        Ok(())
    }
}
