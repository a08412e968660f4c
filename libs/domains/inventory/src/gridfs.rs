//! GridFS implementation of ImageStore

use async_trait::async_trait;
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use mongodb::{
    Database,
    bson::doc,
    gridfs::GridFsBucket,
    options::GridFsBucketOptions,
};
use tracing::instrument;

use crate::error::{InventoryError, InventoryResult};
use crate::images::{ImageStore, image_url};
use crate::models::StoredImage;

/// Default GridFS bucket for item images
pub const IMAGE_BUCKET: &str = "images";

const CONTENT_TYPE_FIELD: &str = "contentType";

/// Image store backed by a GridFS bucket in the inventory database.
///
/// Uploads with an existing file name add a new revision; reads always
/// return the newest one. Older revisions stay in the bucket.
pub struct GridFsImageStore {
    bucket: GridFsBucket,
    public_base_url: String,
}

impl GridFsImageStore {
    /// Create a store over the `images` bucket
    pub fn new(db: &Database, public_base_url: impl Into<String>) -> Self {
        Self::with_bucket(db, IMAGE_BUCKET, public_base_url)
    }

    /// Create a store over a custom bucket name
    pub fn with_bucket(
        db: &Database,
        bucket_name: &str,
        public_base_url: impl Into<String>,
    ) -> Self {
        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket_name.to_string())
            .build();

        Self {
            bucket: db.gridfs_bucket(options),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for GridFsImageStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        object_key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> InventoryResult<String> {
        let metadata = match content_type {
            Some(content_type) => doc! { "contentType": content_type },
            None => doc! {},
        };

        let mut stream = self
            .bucket
            .open_upload_stream(object_key)
            .metadata(metadata)
            .await
            .map_err(|e| InventoryError::UploadFailed(e.to_string()))?;

        stream
            .write_all(&bytes)
            .await
            .map_err(|e| InventoryError::UploadFailed(e.to_string()))?;
        stream
            .close()
            .await
            .map_err(|e| InventoryError::UploadFailed(e.to_string()))?;

        tracing::info!(object_key, "Image uploaded");
        Ok(image_url(&self.public_base_url, object_key))
    }

    #[instrument(skip(self))]
    async fn fetch(&self, object_key: &str) -> InventoryResult<Option<StoredImage>> {
        let latest = self
            .bucket
            .find_one(doc! { "filename": object_key })
            .sort(doc! { "uploadDate": -1, "_id": -1 })
            .await?;

        let Some(file) = latest else {
            return Ok(None);
        };

        let content_type = file
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get_str(CONTENT_TYPE_FIELD).ok())
            .map(str::to_owned);

        let mut stream = self.bucket.open_download_stream(file.id).await?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| InventoryError::StoreUnavailable(e.to_string()))?;

        Ok(Some(StoredImage {
            bytes,
            content_type,
        }))
    }
}
