use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::mongodb::MongoConfig;
use domain_inventory::InventoryConfig;

pub use core_config::Environment;

/// Everything the service reads from the environment at startup
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub inventory: InventoryConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let mongodb = MongoConfig::from_env()?;
        let mongodb = match mongodb.app_name {
            Some(_) => mongodb,
            None => mongodb.with_app_name(env!("CARGO_PKG_NAME")),
        };

        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            mongodb,
            inventory: InventoryConfig::from_env()?,
        })
    }
}
