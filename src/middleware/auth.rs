use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Caller identity extracted from a verified bearer token.
///
/// Handlers take this as an argument (or `Result<AuthUser, ApiError>` when they need to
/// decide the order of their own checks) and hand it to the data store explicitly.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub token: String,
    pub claims: Claims,
}

impl AuthUser {
    /// Identity with the `anon` role and no token, for local tooling and tests.
    pub fn anonymous() -> Self {
        Self {
            token: String::new(),
            claims: Claims::new(None, None, "anon", 1),
        }
    }

    pub fn role(&self) -> &str {
        self.claims.role.as_deref().unwrap_or("anon")
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_from_headers(&parts.headers).map_err(ApiError::unauthorized)?;

        let claims = state.jwt.verify(&token).map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            ApiError::invalid_jwt(e.to_string())
        })?;

        tracing::debug!(
            "Authenticated request as {} ({})",
            claims.sub.as_deref().unwrap_or("-"),
            claims.role.as_deref().unwrap_or("anon")
        );
        Ok(AuthUser { token, claims })
    }
}

/// Extract JWT token from Authorization header
pub fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
