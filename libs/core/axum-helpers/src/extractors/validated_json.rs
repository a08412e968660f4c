//! JSON extractor with automatic validation using the validator crate.

use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor with automatic validation.
///
/// Malformed bodies are rejected with the JSON extraction error; bodies
/// that fail `Validate` are rejected with 400 and per-field details.
///
/// # Example
/// ```ignore
/// use axum::Router;
/// use axum::routing::post;
/// use axum_helpers::extractors::ValidatedJson;
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct AddItem {
///     #[validate(length(min = 1))]
///     name: String,
///     #[validate(range(min = 1))]
///     quantity: i64,
/// }
///
/// async fn add(ValidatedJson(payload): ValidatedJson<AddItem>) -> String {
///     format!("Adding {} x {}", payload.quantity, payload.name)
/// }
///
/// let app = Router::new().route("/inventory", post(add));
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request as HttpRequest, http::StatusCode, routing::post};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Payload {
        #[validate(range(min = 1))]
        quantity: i64,
    }

    async fn handler(ValidatedJson(payload): ValidatedJson<Payload>) -> String {
        payload.quantity.to_string()
    }

    fn request(body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let app = Router::new().route("/", post(handler));
        let response = app.oneshot(request(r#"{"quantity": 2}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_body_reports_fields() {
        let app = Router::new().route("/", post(handler));
        let response = app.oneshot(request(r#"{"quantity": 0}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert!(body["details"]["quantity"].is_array());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let app = Router::new().route("/", post(handler));
        let response = app.oneshot(request("{")).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
