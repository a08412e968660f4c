use std::time::Duration;

#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_parse_or};

const DEFAULT_URL: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "default";

/// Connection settings for a MongoDB deployment.
///
/// ```ignore
/// use database::mongodb::MongoConfig;
///
/// let config = MongoConfig::new("mongodb://localhost:27017", "shop")
///     .with_app_name("inventory-api")
///     .with_pool_size(50, 5);
///
/// // Or, with the `config` feature:
/// let config = MongoConfig::from_env()?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MongoConfig {
    /// `mongodb://[user:pass@]host[:port][/db][?options]`
    pub url: String,
    pub database: String,
    /// Reported to the server in its connection logs
    pub app_name: Option<String>,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connect_timeout: Duration,
    pub server_selection_timeout: Duration,
}

impl MongoConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            app_name: None,
            max_pool_size: 100,
            min_pool_size: 5,
            connect_timeout: Duration::from_secs(10),
            server_selection_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_pool_size(mut self, max: u32, min: u32) -> Self {
        self.max_pool_size = max;
        self.min_pool_size = min;
        self
    }

    /// Bounds how long a request waits for a usable server before failing
    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL, DEFAULT_DATABASE)
    }
}

#[cfg(feature = "config")]
fn first_of(keys: [&str; 2]) -> Result<String, ConfigError> {
    keys.iter()
        .find_map(|key| std::env::var(key).ok())
        .ok_or_else(|| ConfigError::MissingEnvVar(keys.join(" or ")))
}

/// Environment variables:
/// - `MONGODB_URL` or `MONGO_URL` (required)
/// - `MONGODB_DATABASE` or `MONGO_DATABASE` (required)
/// - `MONGODB_APP_NAME`
/// - `MONGODB_MAX_POOL_SIZE` (default 100), `MONGODB_MIN_POOL_SIZE` (default 5)
/// - `MONGODB_CONNECT_TIMEOUT_SECS` (default 10)
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (default 30)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = first_of(["MONGODB_URL", "MONGO_URL"])?;
        let database = first_of(["MONGODB_DATABASE", "MONGO_DATABASE"])?;

        let mut config = Self::new(url, database).with_pool_size(
            env_parse_or("MONGODB_MAX_POOL_SIZE", 100)?,
            env_parse_or("MONGODB_MIN_POOL_SIZE", 5)?,
        );
        config.app_name = std::env::var("MONGODB_APP_NAME").ok();
        config.connect_timeout =
            Duration::from_secs(env_parse_or("MONGODB_CONNECT_TIMEOUT_SECS", 10)?);
        config.server_selection_timeout =
            Duration::from_secs(env_parse_or("MONGODB_SERVER_SELECTION_TIMEOUT_SECS", 30)?);

        Ok(config)
    }
}
