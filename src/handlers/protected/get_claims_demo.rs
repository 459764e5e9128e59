// handlers/protected/get_claims_demo.rs - GET|POST /functions/v1/get-claims-demo
use axum::response::Json;
use serde_json::{json, Value};

use crate::middleware::AuthUser;

/// Echo the verified token's claims back to the caller.
///
/// Missing or unverifiable tokens are rejected by the `AuthUser` extractor with 401.
pub async fn get_claims_demo(auth: AuthUser) -> Json<Value> {
    let claims = &auth.claims;
    let greeting = claims.email.as_deref().unwrap_or("user");

    Json(json!({
        "message": format!("Hello {}!", greeting),
        "user": {
            "id": claims.sub,
            "email": claims.email,
            "role": claims.role,
        },
        "claims": claims.to_json(),
    }))
}
