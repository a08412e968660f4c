//! In-memory stores for tests and local runs.
//!
//! Both stores keep document-level semantics (merge vs overwrite, latest
//! upload wins) and can be switched to an unavailable state to exercise the
//! failure paths of the service.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::{InventoryError, InventoryResult};
use crate::images::{ImageStore, image_url};
use crate::models::{ItemRecord, RecordFields, StoredImage, WriteMode};
use crate::repository::RecordStore;

/// Stored document shape, before validation
#[derive(Debug, Clone, Default)]
struct Document {
    quantity: Option<i64>,
    image_url: Option<String>,
}

impl Document {
    fn decode(&self, name: &str) -> InventoryResult<ItemRecord> {
        let quantity = self
            .quantity
            .ok_or_else(|| InventoryError::malformed(name, "quantity is missing"))?;

        if quantity < 1 {
            return Err(InventoryError::malformed(
                name,
                format!("quantity {} is below 1", quantity),
            ));
        }

        Ok(ItemRecord {
            name: name.to_string(),
            quantity,
            image_url: self.image_url.clone().filter(|url| !url.is_empty()),
        })
    }
}

/// BTreeMap-backed record store; lists in name order.
#[derive(Default)]
pub struct InMemoryRecordStore {
    documents: RwLock<BTreeMap<String, Document>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records directly, bypassing the write counter
    pub async fn with_records(records: impl IntoIterator<Item = ItemRecord>) -> Self {
        let store = Self::new();
        {
            let mut documents = store.documents.write().await;
            for record in records {
                documents.insert(
                    record.name,
                    Document {
                        quantity: Some(record.quantity),
                        image_url: record.image_url,
                    },
                );
            }
        }
        store
    }

    /// Store a raw document that may violate the record invariants
    pub async fn insert_raw(&self, name: &str, quantity: Option<i64>, image_url: Option<String>) {
        self.documents.write().await.insert(
            name.to_string(),
            Document {
                quantity,
                image_url,
            },
        );
    }

    /// Make every following operation fail with `StoreUnavailable`
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of successful `put` and `delete` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> InventoryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(InventoryError::StoreUnavailable(
                "in-memory record store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, name: &str) -> InventoryResult<Option<ItemRecord>> {
        self.check_available()?;
        let documents = self.documents.read().await;
        documents
            .get(name)
            .map(|document| document.decode(name))
            .transpose()
    }

    async fn put(&self, name: &str, fields: RecordFields, mode: WriteMode) -> InventoryResult<()> {
        self.check_available()?;
        let mut documents = self.documents.write().await;

        match mode {
            WriteMode::Merge => {
                let document = documents.entry(name.to_string()).or_default();
                if let Some(quantity) = fields.quantity {
                    document.quantity = Some(quantity);
                }
                if let Some(image_url) = fields.image_url {
                    document.image_url = Some(image_url);
                }
            }
            WriteMode::Overwrite => {
                documents.insert(
                    name.to_string(),
                    Document {
                        quantity: fields.quantity,
                        image_url: fields.image_url,
                    },
                );
            }
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, name: &str) -> InventoryResult<()> {
        self.check_available()?;
        self.documents.write().await.remove(name);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_all(&self) -> InventoryResult<Vec<ItemRecord>> {
        self.check_available()?;
        let documents = self.documents.read().await;

        let records = documents
            .iter()
            .filter_map(|(name, document)| match document.decode(name) {
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

/// HashMap-backed image store
pub struct InMemoryImageStore {
    objects: RwLock<HashMap<String, StoredImage>>,
    public_base_url: String,
    unavailable: AtomicBool,
}

impl InMemoryImageStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            public_base_url: public_base_url.into(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every following upload fail with `UploadFailed`
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of distinct object keys held
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self::new("http://localhost:8080/api")
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn upload(
        &self,
        object_key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> InventoryResult<String> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(InventoryError::UploadFailed(
                "in-memory image store is offline".to_string(),
            ));
        }

        self.objects.write().await.insert(
            object_key.to_string(),
            StoredImage {
                bytes,
                content_type,
            },
        );
        Ok(image_url(&self.public_base_url, object_key))
    }

    async fn fetch(&self, object_key: &str) -> InventoryResult<Option<StoredImage>> {
        Ok(self.objects.read().await.get(object_key).cloned())
    }
}
