//! Shared handles built once at startup.

use domain_inventory::{GridFsImageStore, InventoryService, MongoRecordStore};
use mongodb::{Client, Database};
use std::sync::Arc;

use crate::config::Config;

pub type Inventory = InventoryService<MongoRecordStore, GridFsImageStore>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Shares its connection pool between clones
    pub mongo_client: Client,
    pub db: Database,
}

impl AppState {
    /// Inventory service over the configured collection and image bucket
    pub fn inventory(&self) -> Inventory {
        let settings = &self.config.inventory;
        let records = MongoRecordStore::with_collection(&self.db, &settings.collection);
        let images = GridFsImageStore::with_bucket(
            &self.db,
            &settings.image_bucket,
            settings.public_base_url.clone(),
        );

        InventoryService::from_shared(Arc::new(records), Arc::new(images))
    }
}
