// handlers/public/root.rs - GET / and GET /health
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Edge Playground",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Edge function playground: generic CRUD dispatch, signed uploads, JWT claims and CORS scenarios",
            "store": state.store.name(),
            "endpoints": {
                "db-ops": "POST /functions/v1/db-ops (bearer token)",
                "all-http-methods": "GET|POST|PUT|PATCH|DELETE /functions/v1/all-http-methods (bearer token)",
                "delete-method": "DELETE /functions/v1/delete-method (bearer token)",
                "get-claims-demo": "GET|POST /functions/v1/get-claims-demo (bearer token)",
                "generate-upload-url": "POST /functions/v1/generate-upload-url",
                "test-sdk-version": "GET /functions/v1/test-sdk-version",
                "cors-sdk-demo": "ANY /functions/v1/cors-sdk-demo?scenario=",
                "health": "GET /health",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": state.store.name(),
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "data store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store_error": e.to_string(),
                    }
                })),
            )
        }
    }
}
