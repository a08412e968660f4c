use async_trait::async_trait;

use crate::error::InventoryResult;
use crate::models::{ItemRecord, RecordFields, WriteMode};

/// Keyed document collection holding one record per item name.
///
/// Implementations decode stored documents into [`ItemRecord`] and reject
/// shapes that do not fit. None of the operations are transactional.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point lookup by item name
    async fn get(&self, name: &str) -> InventoryResult<Option<ItemRecord>>;

    /// Write `fields` under `name` according to `mode`
    async fn put(&self, name: &str, fields: RecordFields, mode: WriteMode) -> InventoryResult<()>;

    /// Remove the record; succeeds when it is already gone
    async fn delete(&self, name: &str) -> InventoryResult<()>;

    /// Every record, in store-defined order
    async fn list_all(&self) -> InventoryResult<Vec<ItemRecord>>;
}
