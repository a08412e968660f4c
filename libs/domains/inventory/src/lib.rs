//! Inventory Domain
//!
//! Named item records with a quantity and an optional image, kept in a
//! document store, plus the blob store holding the images.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, image serving
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← add / decrement / delete, snapshot publishing
//! └──┬───────┬──┘
//!    │       │
//! ┌──▼────┐ ┌▼──────┐
//! │Records│ │Images │  ← RecordStore (MongoDB) / ImageStore (GridFS)
//! └───────┘ └───────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_inventory::{
//!     GridFsImageStore, InventoryService, MongoRecordStore, handlers,
//! };
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("shop");
//!
//! let records = MongoRecordStore::new(&db);
//! let images = GridFsImageStore::new(&db, "http://localhost:8080/api");
//! let service = InventoryService::new(records, images);
//!
//! service.add("apple", 3, None).await?;
//! let snapshot = service.decrement("apple").await?;
//! assert_eq!(snapshot.get("apple").map(|r| r.quantity), Some(2));
//!
//! let router = handlers::router(service);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gridfs;
pub mod handlers;
pub mod images;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod query;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use config::InventoryConfig;
pub use error::{InventoryError, InventoryResult};
pub use gridfs::GridFsImageStore;
pub use handlers::ApiDoc;
pub use images::ImageStore;
pub use memory::{InMemoryImageStore, InMemoryRecordStore};
pub use models::{
    AddItem, AddOutcome, ImageOutcome, ImageUpload, InventorySnapshot, ItemRecord, RecordFields,
    WriteMode,
};
pub use mongodb::MongoRecordStore;
pub use query::filter;
pub use repository::RecordStore;
pub use service::InventoryService;
