use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        database = config.mongodb.database(),
        collection = %config.inventory.collection,
        bucket = %config.inventory.image_bucket,
        "Connecting to MongoDB"
    );
    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;
    let db = mongo_client.database(config.mongodb.database());

    let state = AppState {
        config,
        mongo_client,
        db,
    };

    let inventory = state.inventory();
    match inventory.refresh_snapshot().await {
        Ok(snapshot) => info!(items = snapshot.len(), "Loaded inventory"),
        Err(e) => warn!(error = %e, "Initial inventory load failed, serving an empty snapshot"),
    }

    let api_routes = api::routes(inventory, state.config.inventory.max_image_bytes)
        .merge(api::health::router(state.mongo_client.clone()));

    let app = create_router::<openapi::ApiDoc>(api_routes)?
        .merge(health_router(state.config.app.clone()));

    info!("Starting Inventory API");

    let client = state.mongo_client.clone();
    create_production_app(app, &state.config.server, async move {
        info!("Closing MongoDB connections");
        client.shutdown().await;
    })
    .await?;

    info!("Inventory API shutdown complete");
    Ok(())
}
