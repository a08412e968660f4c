//! MongoDB implementation of RecordStore

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Bson, Document, doc},
};
use tracing::instrument;

use crate::error::{InventoryError, InventoryResult};
use crate::models::{ItemRecord, RecordFields, WriteMode};
use crate::repository::RecordStore;

/// Default collection holding inventory documents
pub const INVENTORY_COLLECTION: &str = "inventory";

const QUANTITY_FIELD: &str = "quantity";
const IMAGE_URL_FIELD: &str = "imageUrl";

/// MongoDB implementation of the RecordStore
///
/// Each document is `{ _id: <item name>, quantity, imageUrl }`.
pub struct MongoRecordStore {
    collection: Collection<Document>,
}

impl MongoRecordStore {
    /// Create a store over the `inventory` collection
    ///
    /// # Example
    /// ```ignore
    /// let client = database::mongodb::connect("mongodb://localhost:27017").await?;
    /// let store = MongoRecordStore::new(&client.database("shop"));
    /// ```
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, INVENTORY_COLLECTION)
    }

    /// Create a store over a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Document>(collection_name),
        }
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    fn key(name: &str) -> Document {
        doc! { "_id": name }
    }

    /// Fields present in `fields`, as a `$set` body
    fn set_document(fields: &RecordFields) -> Document {
        let mut set = Document::new();
        if let Some(quantity) = fields.quantity {
            set.insert(QUANTITY_FIELD, quantity);
        }
        if let Some(ref image_url) = fields.image_url {
            set.insert(IMAGE_URL_FIELD, image_url.as_str());
        }
        set
    }
}

/// Decode a stored document into a typed record.
///
/// Accepts `quantity` as int32, int64 or an integral double, and requires it
/// to be at least 1. A missing, null or empty `imageUrl` means no image.
pub fn decode_record(document: &Document) -> InventoryResult<ItemRecord> {
    let name = match document.get("_id") {
        Some(Bson::String(name)) => name.clone(),
        Some(other) => {
            return Err(InventoryError::malformed(
                other.to_string(),
                "document key is not a string",
            ));
        }
        None => return Err(InventoryError::malformed("<unknown>", "document has no key")),
    };

    let quantity = match document.get(QUANTITY_FIELD) {
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Int64(n)) => *n,
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        Some(Bson::Double(f))
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            *f as i64
        }
        Some(other) => {
            return Err(InventoryError::malformed(
                name,
                format!("quantity {} is not an integer", other),
            ));
        }
        None => return Err(InventoryError::malformed(name, "quantity is missing")),
    };

    if quantity < 1 {
        return Err(InventoryError::malformed(
            name,
            format!("quantity {} is below 1", quantity),
        ));
    }

    let image_url = match document.get(IMAGE_URL_FIELD) {
        None | Some(Bson::Null) => None,
        Some(Bson::String(url)) if url.is_empty() => None,
        Some(Bson::String(url)) => Some(url.clone()),
        Some(other) => {
            return Err(InventoryError::malformed(
                name,
                format!("imageUrl {} is not a string", other),
            ));
        }
    };

    Ok(ItemRecord {
        name,
        quantity,
        image_url,
    })
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> InventoryResult<Option<ItemRecord>> {
        let document = self.collection.find_one(Self::key(name)).await?;
        document.as_ref().map(decode_record).transpose()
    }

    #[instrument(skip(self, fields))]
    async fn put(&self, name: &str, fields: RecordFields, mode: WriteMode) -> InventoryResult<()> {
        match mode {
            WriteMode::Merge => {
                let set = Self::set_document(&fields);
                if set.is_empty() {
                    return Ok(());
                }
                self.collection
                    .update_one(Self::key(name), doc! { "$set": set })
                    .upsert(true)
                    .await?;
            }
            WriteMode::Overwrite => {
                let mut replacement = Self::key(name);
                for (field, value) in Self::set_document(&fields) {
                    replacement.insert(field, value);
                }
                self.collection
                    .replace_one(Self::key(name), replacement)
                    .upsert(true)
                    .await?;
            }
        }

        tracing::debug!(item_name = %name, ?mode, "Record written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> InventoryResult<()> {
        let result = self.collection.delete_one(Self::key(name)).await?;
        tracing::debug!(item_name = %name, deleted = result.deleted_count, "Record deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> InventoryResult<Vec<ItemRecord>> {
        let cursor = self.collection.find(doc! {}).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        let records = documents
            .iter()
            .filter_map(|document| match decode_record(document) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping malformed inventory document");
                    None
                }
            })
            .collect();

        Ok(records)
    }
}
