//! Inventory Service - read-modify-write protocol over the record store
//!
//! Every mutation is a read followed by a separate write, with no
//! compare-and-swap between them. Two overlapping `add` or `decrement` calls
//! on the same name can both read the old quantity, and the later write
//! wins. After each successful write the whole collection is listed again
//! and published as a fresh snapshot. Listings are numbered when they start,
//! and one that finishes after a later listing was published is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::error::{InventoryError, InventoryResult};
use crate::images::{ImageStore, image_object_key};
use crate::models::{
    AddOutcome, ImageOutcome, ImageUpload, InventorySnapshot, RecordFields, WriteMode,
};
use crate::repository::RecordStore;

/// Inventory service providing the add/decrement/delete operations
pub struct InventoryService<R: RecordStore, I: ImageStore> {
    records: Arc<R>,
    images: Arc<I>,
    current: Arc<RwLock<Published>>,
    next_generation: Arc<AtomicU64>,
}

/// The current snapshot and the number of the listing that produced it
struct Published {
    generation: u64,
    snapshot: Arc<InventorySnapshot>,
}

impl<R: RecordStore, I: ImageStore> InventoryService<R, I> {
    /// Create a new InventoryService with an empty snapshot
    pub fn new(records: R, images: I) -> Self {
        Self::from_shared(Arc::new(records), Arc::new(images))
    }

    /// Create a service over stores that are shared elsewhere
    pub fn from_shared(records: Arc<R>, images: Arc<I>) -> Self {
        Self {
            records,
            images,
            current: Arc::new(RwLock::new(Published {
                generation: 0,
                snapshot: Arc::new(InventorySnapshot::empty()),
            })),
            next_generation: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The image store, for serving uploaded images
    pub fn image_store(&self) -> Arc<I> {
        Arc::clone(&self.images)
    }

    /// Last published snapshot, without touching the store
    pub async fn snapshot(&self) -> Arc<InventorySnapshot> {
        Arc::clone(&self.current.read().await.snapshot)
    }

    /// List the whole collection and publish it as the current snapshot.
    ///
    /// If a listing started later has already been published, this one is
    /// discarded and the newer snapshot is returned instead.
    #[instrument(skip(self))]
    pub async fn refresh_snapshot(&self) -> InventoryResult<Arc<InventorySnapshot>> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let items = self.records.list_all().await?;
        let snapshot = Arc::new(InventorySnapshot::new(items));

        let mut current = self.current.write().await;
        if generation < current.generation {
            tracing::debug!(
                generation,
                published = current.generation,
                "Discarding listing superseded by a newer refresh"
            );
            return Ok(Arc::clone(&current.snapshot));
        }

        *current = Published {
            generation,
            snapshot: Arc::clone(&snapshot),
        };

        tracing::debug!(items = snapshot.len(), "Inventory snapshot refreshed");
        Ok(snapshot)
    }

    /// Add `quantity` units of `name`, creating the record if needed.
    ///
    /// A supplied image URL replaces the stored one; without one the stored
    /// URL is kept.
    #[instrument(skip(self, image_url), fields(item_name = %name))]
    pub async fn add(
        &self,
        name: &str,
        quantity: i64,
        image_url: Option<String>,
    ) -> InventoryResult<Arc<InventorySnapshot>> {
        validate_name(name)?;
        validate_quantity(quantity)?;

        self.merge_or_create(name, quantity, image_url).await?;
        self.refresh_snapshot().await
    }

    /// Add units of `name`, uploading `image` first when one is supplied.
    ///
    /// A failed upload does not fail the add: the item is stored without a
    /// new image and the failure is reported in the outcome.
    #[instrument(skip(self, image), fields(item_name = %name))]
    pub async fn add_with_image(
        &self,
        name: &str,
        quantity: i64,
        image: Option<ImageUpload>,
    ) -> InventoryResult<AddOutcome> {
        validate_name(name)?;
        validate_quantity(quantity)?;

        let image = match image {
            None => ImageOutcome::NotSupplied,
            Some(upload) => match self.upload_image(upload).await {
                Ok(url) => ImageOutcome::Uploaded { url },
                Err(err) => {
                    tracing::warn!(error = %err, "Image upload failed, adding item without image");
                    ImageOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            },
        };

        let image_url = match &image {
            ImageOutcome::Uploaded { url } => Some(url.clone()),
            _ => None,
        };

        self.merge_or_create(name, quantity, image_url).await?;
        let snapshot = self.refresh_snapshot().await?;

        Ok(AddOutcome { snapshot, image })
    }

    /// Remove one unit of `name`; the record is deleted at quantity 1.
    ///
    /// An absent name is not an error.
    #[instrument(skip(self), fields(item_name = %name))]
    pub async fn decrement(&self, name: &str) -> InventoryResult<Arc<InventorySnapshot>> {
        match self.records.get(name).await? {
            None => {
                tracing::debug!("Decrement of absent item ignored");
            }
            Some(existing) if existing.quantity <= 1 => {
                self.records.delete(name).await?;
                tracing::info!("Item removed after last unit");
            }
            Some(existing) => {
                let fields = RecordFields {
                    quantity: Some(existing.quantity - 1),
                    image_url: None,
                };
                self.records.put(name, fields, WriteMode::Merge).await?;
                tracing::info!(quantity = existing.quantity - 1, "Item decremented");
            }
        }

        self.refresh_snapshot().await
    }

    /// Delete `name` regardless of its quantity
    #[instrument(skip(self), fields(item_name = %name))]
    pub async fn delete_item(&self, name: &str) -> InventoryResult<Arc<InventorySnapshot>> {
        self.records.delete(name).await?;
        tracing::info!("Item deleted");

        self.refresh_snapshot().await
    }

    async fn merge_or_create(
        &self,
        name: &str,
        quantity: i64,
        image_url: Option<String>,
    ) -> InventoryResult<()> {
        let image_url = image_url.filter(|url| !url.trim().is_empty());

        match self.records.get(name).await? {
            Some(existing) => {
                let next = existing.quantity.checked_add(quantity).ok_or_else(|| {
                    InventoryError::InvalidQuantity(format!(
                        "{} + {} overflows",
                        existing.quantity, quantity
                    ))
                })?;

                let fields = RecordFields {
                    quantity: Some(next),
                    image_url,
                };
                self.records.put(name, fields, WriteMode::Merge).await?;
                tracing::info!(quantity = next, "Item quantity increased");
            }
            None => {
                let fields = RecordFields {
                    quantity: Some(quantity),
                    image_url: Some(image_url.unwrap_or_default()),
                };
                self.records.put(name, fields, WriteMode::Overwrite).await?;
                tracing::info!(quantity, "Item created");
            }
        }

        Ok(())
    }

    async fn upload_image(&self, upload: ImageUpload) -> InventoryResult<String> {
        if upload.bytes.is_empty() {
            return Err(InventoryError::UploadFailed("image is empty".to_string()));
        }

        let object_key = image_object_key(&upload.file_name)?;
        self.images
            .upload(&object_key, upload.bytes, upload.content_type)
            .await
    }
}

impl<R: RecordStore, I: ImageStore> Clone for InventoryService<R, I> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            images: Arc::clone(&self.images),
            current: Arc::clone(&self.current),
            next_generation: Arc::clone(&self.next_generation),
        }
    }
}

fn validate_name(name: &str) -> InventoryResult<()> {
    if name.trim().is_empty() {
        return Err(InventoryError::Validation(
            "item name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_quantity(quantity: i64) -> InventoryResult<()> {
    if quantity <= 0 {
        return Err(InventoryError::InvalidQuantity(format!(
            "{} is not a positive integer",
            quantity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::MockImageStore;
    use crate::memory::{InMemoryImageStore, InMemoryRecordStore};
    use crate::models::ItemRecord;
    use crate::repository::MockRecordStore;
    use mockall::predicate::eq;

    fn in_memory() -> InventoryService<InMemoryRecordStore, InMemoryImageStore> {
        InventoryService::new(
            InMemoryRecordStore::new(),
            InMemoryImageStore::new("http://localhost:8080/api"),
        )
    }

    fn upload(file_name: &str) -> ImageUpload {
        ImageUpload {
            file_name: file_name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[tokio::test]
    async fn test_add_absent_name_creates_record() {
        let service = in_memory();
        let snapshot = service.add("apple", 3, None).await.unwrap();
        assert_eq!(snapshot.items(), &[ItemRecord::new("apple", 3)]);
    }

    #[tokio::test]
    async fn test_add_existing_name_sums_and_keeps_image() {
        let service = in_memory();
        service
            .add("apple", 1, Some("http://img/apple.png".into()))
            .await
            .unwrap();
        let snapshot = service.add("apple", 4, None).await.unwrap();

        assert_eq!(
            snapshot.items(),
            &[ItemRecord::new("apple", 5).with_image_url("http://img/apple.png")]
        );
    }

    #[tokio::test]
    async fn test_add_with_new_image_url_replaces_old() {
        let service = in_memory();
        service.add("apple", 1, Some("old".into())).await.unwrap();
        let snapshot = service.add("apple", 1, Some("new".into())).await.unwrap();
        assert_eq!(snapshot.get("apple").unwrap().image_url.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_add_blank_image_url_counts_as_omitted() {
        let service = in_memory();
        service.add("apple", 1, Some("keep".into())).await.unwrap();
        let snapshot = service.add("apple", 1, Some(" ".into())).await.unwrap();
        assert_eq!(snapshot.get("apple").unwrap().image_url.as_deref(), Some("keep"));
    }

    #[tokio::test]
    async fn test_apple_scenario() {
        let service = in_memory();

        let snapshot = service.add("apple", 3, None).await.unwrap();
        assert_eq!(snapshot.items(), &[ItemRecord::new("apple", 3)]);

        let snapshot = service.add("apple", 2, None).await.unwrap();
        assert_eq!(snapshot.items(), &[ItemRecord::new("apple", 5)]);

        for remaining in (0..5).rev() {
            let snapshot = service.decrement("apple").await.unwrap();
            assert_eq!(snapshot.get("apple").map(|r| r.quantity), {
                if remaining == 0 { None } else { Some(remaining) }
            });
        }

        assert!(service.refresh_snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_scenario() {
        let service = in_memory();
        service.add("apple", 1, None).await.unwrap();
        let snapshot = service.add("Banana", 1, None).await.unwrap();

        assert_eq!(snapshot.filter("an"), vec![ItemRecord::new("Banana", 1)]);
        assert_eq!(snapshot.filter("").len(), 2);
    }

    #[tokio::test]
    async fn test_decrement_above_one_keeps_record() {
        let service = in_memory();
        service.add("pear", 3, Some("p".into())).await.unwrap();
        let snapshot = service.decrement("pear").await.unwrap();
        assert_eq!(
            snapshot.items(),
            &[ItemRecord::new("pear", 2).with_image_url("p")]
        );
    }

    #[tokio::test]
    async fn test_decrement_absent_is_noop() {
        let service = in_memory();
        service.add("pear", 1, None).await.unwrap();
        let before = service.snapshot().await;
        let after = service.decrement("plum").await.unwrap();
        assert_eq!(before.items(), after.items());
    }

    #[tokio::test]
    async fn test_delete_item_ignores_quantity_and_is_idempotent() {
        let service = in_memory();
        service.add("pear", 9, None).await.unwrap();
        assert!(service.delete_item("pear").await.unwrap().is_empty());
        assert!(service.delete_item("pear").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_starts_empty() {
        let service = in_memory();
        let snapshot = service.snapshot().await;
        assert!(snapshot.is_empty());
        assert!(snapshot.fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_invalid_quantity_never_reaches_store() {
        // No expectations: any store call panics.
        let service = InventoryService::new(MockRecordStore::new(), MockImageStore::new());

        for quantity in [0, -1, i64::MIN] {
            assert!(matches!(
                service.add("apple", quantity, None).await,
                Err(InventoryError::InvalidQuantity(_))
            ));
        }
        assert!(matches!(
            service.add_with_image("apple", 0, Some(upload("a.png"))).await,
            Err(InventoryError::InvalidQuantity(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_name_never_reaches_store() {
        let service = InventoryService::new(MockRecordStore::new(), MockImageStore::new());

        for name in ["", "   "] {
            assert!(matches!(
                service.add(name, 1, None).await,
                Err(InventoryError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_add_overflow_is_rejected_before_write() {
        let mut records = MockRecordStore::new();
        records
            .expect_get()
            .with(eq("apple"))
            .returning(|_| Ok(Some(ItemRecord::new("apple", i64::MAX))));
        records.expect_put().never();

        let service = InventoryService::new(records, MockImageStore::new());
        assert!(matches!(
            service.add("apple", 1, None).await,
            Err(InventoryError::InvalidQuantity(_))
        ));
    }

    #[tokio::test]
    async fn test_add_existing_uses_merge_write() {
        let mut records = MockRecordStore::new();
        records
            .expect_get()
            .with(eq("apple"))
            .times(1)
            .returning(|_| Ok(Some(ItemRecord::new("apple", 2).with_image_url("u"))));
        records
            .expect_put()
            .withf(|name, fields, mode| {
                name == "apple"
                    && *fields
                        == RecordFields {
                            quantity: Some(5),
                            image_url: None,
                        }
                    && *mode == WriteMode::Merge
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        records
            .expect_list_all()
            .times(1)
            .returning(|| Ok(vec![ItemRecord::new("apple", 5).with_image_url("u")]));

        let service = InventoryService::new(records, MockImageStore::new());
        let snapshot = service.add("apple", 3, None).await.unwrap();
        assert_eq!(snapshot.get("apple").unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_add_absent_uses_overwrite_with_empty_image() {
        let mut records = MockRecordStore::new();
        records.expect_get().returning(|_| Ok(None));
        records
            .expect_put()
            .withf(|name, fields, mode| {
                name == "kiwi"
                    && fields.quantity == Some(2)
                    && fields.image_url.as_deref() == Some("")
                    && *mode == WriteMode::Overwrite
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        records
            .expect_list_all()
            .returning(|| Ok(vec![ItemRecord::new("kiwi", 2)]));

        let service = InventoryService::new(records, MockImageStore::new());
        service.add("kiwi", 2, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_leaves_snapshot_stale() {
        let records = Arc::new(InMemoryRecordStore::new());
        let service =
            InventoryService::from_shared(Arc::clone(&records), Arc::new(InMemoryImageStore::default()));
        let before = service.add("apple", 2, None).await.unwrap();

        records.set_available(false);

        assert!(matches!(
            service.add("apple", 1, None).await,
            Err(InventoryError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.decrement("apple").await,
            Err(InventoryError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.delete_item("apple").await,
            Err(InventoryError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.refresh_snapshot().await,
            Err(InventoryError::StoreUnavailable(_))
        ));
        assert_eq!(service.snapshot().await, before);
        assert_eq!(records.write_count(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_skips_refresh() {
        let mut records = MockRecordStore::new();
        records
            .expect_get()
            .returning(|_| Ok(Some(ItemRecord::new("apple", 3))));
        records
            .expect_put()
            .returning(|_, _, _| Err(InventoryError::StoreUnavailable("timeout".into())));
        records.expect_list_all().never();

        let service = InventoryService::new(records, MockImageStore::new());
        assert!(matches!(
            service.decrement("apple").await,
            Err(InventoryError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_decrement_last_unit_deletes() {
        let mut records = MockRecordStore::new();
        records
            .expect_get()
            .returning(|_| Ok(Some(ItemRecord::new("apple", 1))));
        records
            .expect_delete()
            .with(eq("apple"))
            .times(1)
            .returning(|_| Ok(()));
        records.expect_put().never();
        records.expect_list_all().returning(|| Ok(vec![]));

        let service = InventoryService::new(records, MockImageStore::new());
        assert!(service.decrement("apple").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_with_image_uploads_under_images_prefix() {
        let service = in_memory();
        let outcome = service
            .add_with_image("apple", 2, Some(upload("photos/apple.png")))
            .await
            .unwrap();

        let url = "http://localhost:8080/api/images/apple.png".to_string();
        assert_eq!(outcome.image, ImageOutcome::Uploaded { url: url.clone() });
        assert_eq!(
            outcome.snapshot.items(),
            &[ItemRecord::new("apple", 2).with_image_url(url)]
        );

        let stored = service
            .image_store()
            .fetch("images/apple.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_add_with_image_upload_failure_still_adds() {
        let mut images = MockImageStore::new();
        images
            .expect_upload()
            .times(1)
            .returning(|_, _, _| Err(InventoryError::UploadFailed("quota exceeded".into())));

        let service = InventoryService::new(InMemoryRecordStore::new(), images);
        let outcome = service
            .add_with_image("apple", 1, Some(upload("apple.png")))
            .await
            .unwrap();

        assert!(matches!(outcome.image, ImageOutcome::Failed { ref reason } if reason.contains("quota")));
        assert_eq!(outcome.snapshot.items(), &[ItemRecord::new("apple", 1)]);
    }

    #[tokio::test]
    async fn test_add_with_image_failure_keeps_existing_image() {
        let service = in_memory();
        service.add("apple", 1, Some("first".into())).await.unwrap();

        let bad = ImageUpload {
            bytes: Vec::new(),
            ..upload("apple.png")
        };
        let outcome = service.add_with_image("apple", 1, Some(bad)).await.unwrap();

        assert!(matches!(outcome.image, ImageOutcome::Failed { .. }));
        assert_eq!(
            outcome.snapshot.items(),
            &[ItemRecord::new("apple", 2).with_image_url("first")]
        );
    }

    #[tokio::test]
    async fn test_add_with_image_without_image() {
        let service = in_memory();
        let outcome = service.add_with_image("apple", 1, None).await.unwrap();
        assert_eq!(outcome.image, ImageOutcome::NotSupplied);
        assert_eq!(outcome.snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_snapshot() {
        let service = in_memory();
        let clone = service.clone();
        service.add("apple", 1, None).await.unwrap();
        assert_eq!(clone.snapshot().await.len(), 1);
    }

    /// Record store whose first listing blocks until released and returns
    /// older data than every later listing.
    struct SlowFirstListing {
        listings: std::sync::atomic::AtomicUsize,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl RecordStore for SlowFirstListing {
        async fn get(&self, _name: &str) -> InventoryResult<Option<ItemRecord>> {
            Ok(None)
        }

        async fn put(&self, _: &str, _: RecordFields, _: WriteMode) -> InventoryResult<()> {
            Ok(())
        }

        async fn delete(&self, _name: &str) -> InventoryResult<()> {
            Ok(())
        }

        async fn list_all(&self) -> InventoryResult<Vec<ItemRecord>> {
            if self.listings.fetch_add(1, Ordering::SeqCst) == 0 {
                self.release.notified().await;
                Ok(vec![ItemRecord::new("apple", 1)])
            } else {
                Ok(vec![ItemRecord::new("apple", 2)])
            }
        }
    }

    #[tokio::test]
    async fn test_late_listing_does_not_replace_newer_snapshot() {
        let store = Arc::new(SlowFirstListing {
            listings: std::sync::atomic::AtomicUsize::new(0),
            release: tokio::sync::Notify::new(),
        });
        let service = InventoryService::from_shared(
            Arc::clone(&store),
            Arc::new(InMemoryImageStore::default()),
        );

        let early = service.clone();
        let early_refresh = tokio::spawn(async move { early.refresh_snapshot().await });
        while store.listings.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let newer = service.refresh_snapshot().await.unwrap();
        assert_eq!(newer.items(), &[ItemRecord::new("apple", 2)]);

        store.release.notify_one();
        let returned = early_refresh.await.unwrap().unwrap();

        assert_eq!(returned.items(), &[ItemRecord::new("apple", 2)]);
        assert_eq!(
            service.snapshot().await.items(),
            &[ItemRecord::new("apple", 2)]
        );
    }
}
