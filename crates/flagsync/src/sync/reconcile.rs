//! Delete-then-insert reconciliation of one batch.

use std::collections::HashMap;

use crate::catalog::{FlagRecord, RecordKey};
use crate::store::{RecordStore, StoreError};

use super::types::ReconcileStats;

/// Collapse records sharing a key.
///
/// The surviving record is the last one seen for its key, placed where the
/// key first appeared.
fn dedupe(records: &[FlagRecord]) -> Vec<FlagRecord> {
    let mut position: HashMap<RecordKey, usize> = HashMap::with_capacity(records.len());
    let mut batch: Vec<FlagRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = record.key();
        match position.get(&key) {
            Some(&idx) => batch[idx] = record.clone(),
            None => {
                position.insert(key, batch.len());
                batch.push(record.clone());
            }
        }
    }
    batch
}

/// Make the store hold exactly one record per key of `records`.
///
/// Every key is deleted first, then the whole batch is inserted at once.
/// Records whose key is absent from the batch are left alone. This is not a
/// transaction: on error the store may be partially updated and the next
/// cycle converges it.
///
/// # Errors
/// Propagates the first `StoreError` unchanged.
pub async fn reconcile<S>(store: &S, records: &[FlagRecord]) -> Result<ReconcileStats, StoreError>
where
    S: RecordStore + ?Sized,
{
    if records.is_empty() {
        return Ok(ReconcileStats::default());
    }

    let batch = dedupe(records);
    let collapsed = records.len() - batch.len();
    if collapsed > 0 {
        tracing::debug!(collapsed, "Collapsed duplicate identifiers in batch");
    }

    let mut deleted = 0u64;
    for record in &batch {
        deleted += store.delete_matching(&record.key()).await?;
    }

    let inserted = store.insert_many(&batch).await?;

    Ok(ReconcileStats {
        deleted,
        inserted,
        collapsed,
    })
}
