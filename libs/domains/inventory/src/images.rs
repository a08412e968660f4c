//! Image blob storage

use async_trait::async_trait;

use crate::error::{InventoryError, InventoryResult};
use crate::models::StoredImage;

/// Prefix shared by every image object key
pub const IMAGE_KEY_PREFIX: &str = "images";

/// Object storage for item images.
///
/// Keys come from the uploaded file name, so uploading a second file with
/// the same name supersedes the first. There is no delete.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` under `object_key` and return the retrieval URL
    async fn upload(
        &self,
        object_key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> InventoryResult<String>;

    /// Latest bytes stored under `object_key`
    async fn fetch(&self, object_key: &str) -> InventoryResult<Option<StoredImage>>;
}

/// Derive the object key `images/<file name>` from a client file name.
///
/// Any directory part the client sent is dropped.
pub fn image_object_key(file_name: &str) -> InventoryResult<String> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(InventoryError::Validation(format!(
            "invalid image file name '{}'",
            file_name
        )));
    }

    Ok(format!("{}/{}", IMAGE_KEY_PREFIX, base))
}

/// Public URL for an object key, percent-encoding each path segment
pub fn image_url(public_base_url: &str, object_key: &str) -> String {
    let encoded: Vec<_> = object_key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!(
        "{}/{}",
        public_base_url.trim_end_matches('/'),
        encoded.join("/")
    )
}

/// Best-effort content type from the file extension
pub fn guess_content_type(object_key: &str) -> &'static str {
    let extension = object_key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
