// handlers/protected/db_ops.rs - POST /functions/v1/db-ops
use axum::{body::Bytes, extract::State};

use crate::dispatch::{Dispatcher, OperationOutput};
use crate::handlers::parse_json_body;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// Dispatch one generic CRUD operation as the calling user.
///
/// Success is `{"success": true, "data": ...}`; every failure is `{"error", "code"}` with the
/// status from the error taxonomy.
pub async fn db_ops(State(state): State<AppState>, auth: AuthUser, body: Bytes) -> ApiResult<OperationOutput> {
    let body = parse_json_body(&body)?;
    let output = Dispatcher::new(state.store.as_ref(), &auth).dispatch_json(&body).await?;
    Ok(ApiResponse::success(output))
}
