use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory API",
        version = "0.1.0",
        description = "Named item records with quantities and images, stored in MongoDB",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/inventory", api = domain_inventory::ApiDoc)
    ),
    tags(
        (name = "Inventory", description = "Inventory record endpoints (MongoDB)")
    )
)]
pub struct ApiDoc;
