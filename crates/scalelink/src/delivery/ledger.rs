//! Delivery ledger
//!
//! Flags the entries of a delivered bucket as sent. The update is all or
//! nothing and only touches entries still pending, so a second process
//! that delivered the same entries first is detected instead of
//! overwritten.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use scalelink_common::Result;

use crate::store::ChangeLogStore;

/// Mark `entry_ids` as sent at `sent_at`; returns how many were flagged
pub async fn mark_sent<S>(store: &S, entry_ids: &[i64], sent_at: DateTime<Utc>) -> Result<u64>
where
    S: ChangeLogStore + ?Sized,
{
    if entry_ids.is_empty() {
        return Ok(0);
    }

    let marked = store.mark_sent(entry_ids, sent_at).await?;
    if marked < entry_ids.len() as u64 {
        warn!(
            requested = entry_ids.len(),
            marked,
            "Entries were delivered but already flagged as sent"
        );
    }
    info!("Marked {} change log entries as sent", marked);
    Ok(marked)
}
