// handlers/protected/delete_method.rs - DELETE /functions/v1/delete-method
use axum::{
    body::Bytes,
    extract::State,
    http::Method,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use super::body_id;
use crate::dispatch::{Dispatcher, OperationRequest};
use crate::error::ApiError;
use crate::handlers::{parse_json_body, timestamp};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::types::Table;

/// Delete one todo, accepting only the DELETE verb.
///
/// The method is checked before the caller, so a GET without a token is still a 405.
pub async fn delete_method(
    State(state): State<AppState>,
    method: Method,
    auth: Result<AuthUser, ApiError>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if method == Method::OPTIONS {
        return Ok("ok".into_response());
    }
    if method != Method::DELETE {
        return Err(ApiError::method_not_allowed(
            "Method not allowed. Use DELETE method.",
            &["DELETE", "OPTIONS"],
        ));
    }

    let auth = auth?;
    let body = parse_json_body(&body)?;
    let id = body_id(&body, "Missing 'id' field in request body")?;

    tracing::info!("Deleting todo with ID: {}", id);
    let deleted = Dispatcher::new(state.store.as_ref(), &auth)
        .dispatch(OperationRequest::Delete { table: Table::Todos, id: id.clone() })
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Todo with ID {} deleted successfully using HTTP DELETE method", id),
        "method": method.as_str(),
        "timestamp": timestamp(),
        "deletedTodo": deleted,
    }))
    .into_response())
}
