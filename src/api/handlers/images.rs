use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::AppState;

/// Serve stored image bytes by blob key.
/// Route: GET /images/*key
///
/// This is the resolution path behind `LocalStore::access_url`; GCS-backed
/// deployments hand out signed URLs instead and never hit this route.
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(key): axum::extract::Path<String>,
) -> Result<Response, ApiError> {
    let data = state.object_store.get(&key).await.map_err(|e| match e {
        crate::object_store::ObjectStoreError::NotFound(_) => {
            ApiError::not_found("Image not found")
        }
        _ => ApiError::internal(format!("Failed to retrieve image: {e}")),
    })?;

    // The key's last segment is the sanitized upload filename
    let content_type = mime_guess::from_path(&key)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    // Cache for 1 hour (images are immutable once uploaded)
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
