//! Database connectors and connection utilities
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB client setup and health checks
//! - `config` - `core_config::FromEnv` support for connection settings
//! - `all` - All features
//!
//! # Example
//!
//! ```ignore
//! use database::common::RetryConfig;
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//!
//! let config = MongoConfig::new("mongodb://localhost:27017", "shop");
//! let client = connect_from_config_with_retry(&config, Some(RetryConfig::new())).await?;
//! let db = client.database(config.database());
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::RetryConfig;
