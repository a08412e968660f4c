use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};

use crate::gridfs::IMAGE_BUCKET;
use crate::mongodb::INVENTORY_COLLECTION;

const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Inventory storage settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Collection holding item records
    pub collection: String,
    /// GridFS bucket holding item images
    pub image_bucket: String,
    /// Base of the URLs handed out for uploaded images
    pub public_base_url: String,
    /// Largest accepted upload body, in bytes
    pub max_image_bytes: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            collection: INVENTORY_COLLECTION.to_string(),
            image_bucket: IMAGE_BUCKET.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl FromEnv for InventoryConfig {
    /// Environment variables (all optional):
    /// - `INVENTORY_COLLECTION` (default: inventory)
    /// - `IMAGE_BUCKET` (default: images)
    /// - `IMAGE_PUBLIC_BASE_URL` (default: http://localhost:8080/api)
    /// - `IMAGE_MAX_BYTES` (default: 10 MiB)
    fn from_env() -> Result<Self, ConfigError> {
        let max_image_bytes = env_parse_or("IMAGE_MAX_BYTES", DEFAULT_MAX_IMAGE_BYTES)?;

        Ok(Self {
            collection: env_or_default("INVENTORY_COLLECTION", INVENTORY_COLLECTION),
            image_bucket: env_or_default("IMAGE_BUCKET", IMAGE_BUCKET),
            public_base_url: env_or_default("IMAGE_PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL),
            max_image_bytes,
        })
    }
}
