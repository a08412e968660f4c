use mongodb::bson::doc;
use mongodb::{Client, options::ClientOptions};
use tracing::{info, instrument};

use super::MongoConfig;
use crate::common::{RetryConfig, retry, retry_with_backoff};

#[derive(Debug, thiserror::Error)]
pub enum MongoError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// The client was built but the server never answered a ping
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// Connect with default pool settings and verify the server answers.
pub async fn connect(url: &str) -> Result<Client, MongoError> {
    connect_from_config(&MongoConfig::new(url, "admin")).await
}

/// Build a client from `config` and ping the server once.
///
/// The driver connects lazily, so without the ping a wrong URL would
/// only surface on the first request.
#[instrument(skip_all, fields(database = %config.database))]
pub async fn connect_from_config(config: &MongoConfig) -> Result<Client, MongoError> {
    info!("Connecting to MongoDB");

    let mut options = ClientOptions::parse(&config.url).await?;
    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);
    if let Some(app_name) = &config.app_name {
        options.app_name = Some(app_name.clone());
    }

    let client = Client::with_options(options)?;
    ping(&client)
        .await
        .map_err(|e| MongoError::ConnectionFailed(e.to_string()))?;

    info!("Connected to MongoDB");
    Ok(client)
}

/// [`connect`] with exponential backoff; `None` uses [`RetryConfig::default`].
pub async fn connect_with_retry(
    url: &str,
    retry_config: Option<RetryConfig>,
) -> Result<Client, MongoError> {
    match retry_config {
        Some(config) => retry_with_backoff(|| connect(url), config).await,
        None => retry(|| connect(url)).await,
    }
}

/// [`connect_from_config`] with exponential backoff.
///
/// ```ignore
/// use core_config::FromEnv;
/// use database::mongodb::{MongoConfig, connect_from_config_with_retry};
///
/// let config = MongoConfig::from_env()?;
/// let client = connect_from_config_with_retry(&config, None).await?;
/// ```
pub async fn connect_from_config_with_retry(
    config: &MongoConfig,
    retry_config: Option<RetryConfig>,
) -> Result<Client, MongoError> {
    match retry_config {
        Some(policy) => retry_with_backoff(|| connect_from_config(config), policy).await,
        None => retry(|| connect_from_config(config)).await,
    }
}

pub(crate) async fn ping(client: &Client) -> Result<(), mongodb::error::Error> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_invalid_url_fails_before_network() {
        let err = connect("not-a-mongodb-url").await.unwrap_err();
        assert!(matches!(err, MongoError::Mongo(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_failure() {
        let config = MongoConfig::new("mongodb://127.0.0.1:1", "shop")
            .with_server_selection_timeout(Duration::from_millis(200));

        let err = connect_from_config_with_retry(
            &config,
            Some(
                RetryConfig::new()
                    .with_max_retries(1)
                    .with_initial_delay(Duration::from_millis(10))
                    .without_jitter(),
            ),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MongoError::ConnectionFailed(_)));
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB"]
    async fn test_connect_local() {
        let url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        assert!(connect(&url).await.is_ok());
    }
}
