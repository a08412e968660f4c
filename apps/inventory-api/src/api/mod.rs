//! HTTP routes, nested under `/api` by `create_router`

pub mod health;

use axum::{Router, extract::DefaultBodyLimit};
use domain_inventory::{ImageStore, InventoryService, RecordStore, handlers};

/// `/inventory` record endpoints and `/images` file serving.
///
/// Upload bodies are capped at `max_image_bytes`; reading past the cap
/// fails the form with 400 and nothing is stored.
pub fn routes<R, I>(service: InventoryService<R, I>, max_image_bytes: usize) -> Router
where
    R: RecordStore + 'static,
    I: ImageStore + 'static,
{
    let images = service.image_store();

    Router::new()
        .nest(
            "/inventory",
            handlers::router(service).layer(DefaultBodyLimit::max(max_image_bytes)),
        )
        .nest("/images", handlers::image_router(images))
}
