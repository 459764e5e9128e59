// handlers/public/test_sdk_version.rs - GET /functions/v1/test-sdk-version
use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::handlers::timestamp;
use crate::state::AppState;

/// Runtime self-check: reports whether the service's collaborators are reachable.
pub async fn test_sdk_version(State(state): State<AppState>) -> Json<Value> {
    let store = match state.store.health_check().await {
        Ok(()) => json!({
            "success": true,
            "message": "Data store reachable",
            "backend": state.store.name(),
        }),
        Err(e) => json!({
            "success": false,
            "message": e.to_string(),
            "backend": state.store.name(),
        }),
    };

    let storage_configured = state.config.storage.is_configured();

    Json(json!({
        "timestamp": timestamp(),
        "tests": {
            "clientCreation": {
                "success": true,
                "message": "Service clients created successfully",
                "hasClient": true,
            },
            "functionality": store,
            "storage": {
                "success": storage_configured,
                "message": if storage_configured { "Storage endpoint configured" } else { "Storage endpoint not configured" },
                "defaultBucket": state.config.storage.default_bucket,
            },
        },
        "info": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "environment": format!("{:?}", state.config.environment),
        },
    }))
}
