//! Readiness endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use mongodb::Client;
use serde_json::Value;

pub fn router(client: Client) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(client)
}

/// 200 once MongoDB answers a ping, 503 otherwise
async fn readiness_check(State(client): State<Client>) -> (StatusCode, Json<Value>) {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![(
        "mongodb",
        Box::pin(async {
            database::mongodb::check_health(&client)
                .await
                .map_err(|e| e.to_string())
        }),
    )];

    run_health_checks(checks).await
}
