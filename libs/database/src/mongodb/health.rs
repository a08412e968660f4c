use mongodb::Client;

use super::MongoError;
use super::connector::ping;

/// Ping the server; suitable as a readiness check.
pub async fn check_health(client: &Client) -> Result<(), MongoError> {
    ping(client).await.map_err(MongoError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::options::ClientOptions;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let mut options = ClientOptions::parse("mongodb://127.0.0.1:1").await.unwrap();
        options.server_selection_timeout = Some(Duration::from_millis(200));
        let client = Client::with_options(options).unwrap();

        assert!(matches!(
            check_health(&client).await,
            Err(MongoError::Mongo(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB"]
    async fn test_local_server_is_healthy() {
        let client = Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        assert!(check_health(&client).await.is_ok());
    }
}
