use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::query;

/// A single inventory entry, keyed by its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    /// Item name (document key, case-sensitive)
    pub name: String,
    /// Units held, always at least 1
    pub quantity: i64,
    /// Retrieval URL of the attached image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            quantity,
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Fields carried by a record write.
///
/// `None` means "not specified": a merge write leaves the stored value
/// alone, an overwrite drops it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields {
    pub quantity: Option<i64>,
    pub image_url: Option<String>,
}

/// How a record write treats the document already stored under the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Update only the specified fields, creating the document if absent
    Merge,
    /// Replace the whole document
    Overwrite,
}

/// Every record as of one full collection fetch.
///
/// Snapshots are immutable; a refresh produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub items: Vec<ItemRecord>,
    /// When the records were listed; `None` before the first refresh
    pub fetched_at: Option<DateTime<Utc>>,
}

impl InventorySnapshot {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            fetched_at: None,
        }
    }

    pub fn new(items: Vec<ItemRecord>) -> Self {
        Self {
            items,
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ItemRecord> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Records whose name contains `query`, ignoring case
    pub fn filter(&self, query: &str) -> Vec<ItemRecord> {
        query::filter(&self.items, query)
    }
}

impl Default for InventorySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// DTO for adding units of an item
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

/// Multipart form accepted by the upload endpoint (documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadItemForm {
    pub name: String,
    pub quantity: i64,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

/// Query parameters for listing the inventory
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct InventoryQuery {
    /// Case-insensitive substring of the item name
    pub search: Option<String>,
}

/// Image file supplied alongside an add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Image bytes read back from the blob store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// What happened to the image step of an add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    NotSupplied,
    Uploaded { url: String },
    Failed { reason: String },
}

/// Result of an add that carried an image
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub snapshot: Arc<InventorySnapshot>,
    pub image: ImageOutcome,
}

/// Response body of the upload endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub snapshot: InventorySnapshot,
    pub image: ImageOutcome,
}

impl From<AddOutcome> for UploadResponse {
    fn from(outcome: AddOutcome) -> Self {
        Self {
            snapshot: outcome.snapshot.as_ref().clone(),
            image: outcome.image,
        }
    }
}
