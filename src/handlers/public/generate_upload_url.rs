// handlers/public/generate_upload_url.rs - POST /functions/v1/generate-upload-url
use axum::{body::Bytes, extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::parse_json_body;
use crate::state::AppState;
use crate::storage::{prepare_upload, UploadRequest};

/// Issue a signed URL the client can PUT a file to directly.
///
/// Body: `{"fileName": "...", "bucketName": "..."}`; the bucket defaults to the configured one.
pub async fn generate_upload_url(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = parse_json_body(&body)?;
    let request: UploadRequest =
        serde_json::from_value(body).map_err(|e| ApiError::invalid_request(format!("Invalid upload request: {}", e)))?;

    let (signed, bucket) = prepare_upload(state.signer.as_ref(), request, &state.config.storage.default_bucket)
        .await
        .map_err(|e| {
            tracing::error!("Error creating signed URL: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(json!({
        "signedUrl": signed.signed_url,
        "path": signed.path,
        "token": signed.token,
        "bucketName": bucket,
    })))
}
