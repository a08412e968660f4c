//! Search over an in-memory snapshot

use crate::models::ItemRecord;

/// Keep the records whose name contains `query`, ignoring case.
///
/// Order is preserved. An empty query keeps everything.
pub fn filter(records: &[ItemRecord], query: &str) -> Vec<ItemRecord> {
    if query.is_empty() {
        return records.to_vec();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
