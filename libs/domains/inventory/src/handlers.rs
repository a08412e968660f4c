use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_helpers::{
    ValidatedJson,
    errors::responses::{
        BadGatewayResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse, ServiceUnavailableResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{InventoryError, InventoryResult};
use crate::images::{IMAGE_KEY_PREFIX, ImageStore, guess_content_type};
use crate::models::{
    AddItem, ImageOutcome, ImageUpload, InventoryQuery, InventorySnapshot, ItemRecord,
    UploadItemForm, UploadResponse,
};
use crate::repository::RecordStore;
use crate::service::InventoryService;

/// OpenAPI documentation for the Inventory API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_inventory,
        add_item,
        upload_item,
        increment_item,
        decrement_item,
        delete_item,
    ),
    components(
        schemas(
            ItemRecord,
            InventorySnapshot,
            AddItem,
            UploadItemForm,
            UploadResponse,
            ImageOutcome,
            InventoryQuery
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadGatewayResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Inventory", description = "Inventory record endpoints (MongoDB)")
    )
)]
pub struct ApiDoc;

/// Create the inventory router with all HTTP endpoints
pub fn router<R, I>(service: InventoryService<R, I>) -> Router
where
    R: RecordStore + 'static,
    I: ImageStore + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_inventory).post(add_item))
        .route("/upload", post(upload_item))
        .route("/{name}", delete(delete_item))
        .route("/{name}/increment", post(increment_item))
        .route("/{name}/decrement", post(decrement_item))
        .with_state(shared_service)
}

/// Create the router serving stored images by file name
pub fn image_router<I: ImageStore + 'static>(images: Arc<I>) -> Router {
    Router::new()
        .route("/{file_name}", get(get_image))
        .with_state(images)
}

/// List inventory records, optionally filtered by name
#[utoipa::path(
    get,
    path = "",
    tag = "Inventory",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Matching records", body = Vec<ItemRecord>),
        (status = 500, response = InternalServerErrorResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn list_inventory<R: RecordStore, I: ImageStore>(
    State(service): State<Arc<InventoryService<R, I>>>,
    Query(query): Query<InventoryQuery>,
) -> InventoryResult<Json<Vec<ItemRecord>>> {
    let snapshot = service.refresh_snapshot().await?;
    let search = query.search.unwrap_or_default();
    Ok(Json(snapshot.filter(&search)))
}

/// Add units of an item, creating it when absent
#[utoipa::path(
    post,
    path = "",
    tag = "Inventory",
    request_body = AddItem,
    responses(
        (status = 200, description = "Inventory after the add", body = InventorySnapshot),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn add_item<R: RecordStore, I: ImageStore>(
    State(service): State<Arc<InventoryService<R, I>>>,
    ValidatedJson(input): ValidatedJson<AddItem>,
) -> InventoryResult<Json<InventorySnapshot>> {
    let snapshot = service
        .add(&input.name, input.quantity, input.image_url)
        .await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// Add units of an item together with an image file
///
/// A failed image upload still adds the item; the `image` field of the
/// response reports what happened.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Inventory",
    request_body(content = UploadItemForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Inventory after the add", body = UploadResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn upload_item<R: RecordStore, I: ImageStore>(
    State(service): State<Arc<InventoryService<R, I>>>,
    multipart: Multipart,
) -> InventoryResult<Json<UploadResponse>> {
    let form = read_upload_form(multipart).await?;
    let outcome = service
        .add_with_image(&form.name, form.quantity, form.image)
        .await?;
    Ok(Json(outcome.into()))
}

/// Add one unit of an item
#[utoipa::path(
    post,
    path = "/{name}/increment",
    tag = "Inventory",
    params(
        ("name" = String, Path, description = "Item name")
    ),
    responses(
        (status = 200, description = "Inventory after the add", body = InventorySnapshot),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn increment_item<R: RecordStore, I: ImageStore>(
    State(service): State<Arc<InventoryService<R, I>>>,
    Path(name): Path<String>,
) -> InventoryResult<Json<InventorySnapshot>> {
    let snapshot = service.add(&name, 1, None).await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// Remove one unit of an item; the last unit removes the item
#[utoipa::path(
    post,
    path = "/{name}/decrement",
    tag = "Inventory",
    params(
        ("name" = String, Path, description = "Item name")
    ),
    responses(
        (status = 200, description = "Inventory after the decrement", body = InventorySnapshot),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn decrement_item<R: RecordStore, I: ImageStore>(
    State(service): State<Arc<InventoryService<R, I>>>,
    Path(name): Path<String>,
) -> InventoryResult<Json<InventorySnapshot>> {
    let snapshot = service.decrement(&name).await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// Delete an item regardless of its quantity
#[utoipa::path(
    delete,
    path = "/{name}",
    tag = "Inventory",
    params(
        ("name" = String, Path, description = "Item name")
    ),
    responses(
        (status = 204, description = "Item deleted (or already absent)"),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn delete_item<R: RecordStore, I: ImageStore>(
    State(service): State<Arc<InventoryService<R, I>>>,
    Path(name): Path<String>,
) -> InventoryResult<impl IntoResponse> {
    service.delete_item(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_image<I: ImageStore>(
    State(images): State<Arc<I>>,
    Path(file_name): Path<String>,
) -> InventoryResult<impl IntoResponse> {
    let object_key = format!("{}/{}", IMAGE_KEY_PREFIX, file_name);

    let image = images
        .fetch(&object_key)
        .await?
        .ok_or_else(|| InventoryError::ImageNotFound(object_key.clone()))?;

    let content_type = image
        .content_type
        .unwrap_or_else(|| guess_content_type(&object_key).to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], image.bytes))
}

struct UploadForm {
    name: String,
    quantity: i64,
    image: Option<ImageUpload>,
}

async fn read_upload_form(mut multipart: Multipart) -> InventoryResult<UploadForm> {
    let mut name = None;
    let mut quantity = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InventoryError::Validation(e.body_text()))?
    {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| InventoryError::Validation(e.body_text()))?;
                name = Some(text);
            }
            Some("quantity") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| InventoryError::Validation(e.body_text()))?;
                let parsed = text.trim().parse::<i64>().map_err(|_| {
                    InventoryError::InvalidQuantity(format!("'{}' is not an integer", text))
                })?;
                quantity = Some(parsed);
            }
            Some("image") => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| InventoryError::Validation(e.body_text()))?;

                // A file input left empty still sends a part without a file name
                if let Some(file_name) = file_name.filter(|f| !f.is_empty()) {
                    image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    let name = name.ok_or_else(|| InventoryError::Validation("name is required".to_string()))?;
    let quantity = quantity
        .ok_or_else(|| InventoryError::InvalidQuantity("quantity is required".to_string()))?;

    Ok(UploadForm {
        name,
        quantity,
        image,
    })
}
