// handlers/public/cors_sdk_demo.rs - ANY /functions/v1/cors-sdk-demo?scenario=
//
// Builds its CORS headers per request instead of going through the shared layer.
use std::str::FromStr;

use axum::{
    extract::Query,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cors::{CorsError, CorsOptions};

pub const CUSTOM_ORIGIN: &str = "https://myapp.com";
pub const EXTRA_HEADERS: &[&str] = &["x-custom-header", "x-api-version", "x-request-id"];
pub const ALLOWED_ORIGINS: &[&str] = &["https://app1.com", "https://app2.com", "https://staging.myapp.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsScenario {
    Basic,
    CustomOrigin,
    WithCredentials,
    AdditionalHeaders,
    MultipleOrigins,
}

impl CorsScenario {
    pub const ALL: [CorsScenario; 5] = [
        CorsScenario::Basic,
        CorsScenario::CustomOrigin,
        CorsScenario::WithCredentials,
        CorsScenario::AdditionalHeaders,
        CorsScenario::MultipleOrigins,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CorsScenario::Basic => "basic",
            CorsScenario::CustomOrigin => "custom-origin",
            CorsScenario::WithCredentials => "with-credentials",
            CorsScenario::AdditionalHeaders => "additional-headers",
            CorsScenario::MultipleOrigins => "multiple-origins",
        }
    }

    /// Header policy for this scenario. `request_origin` only matters for `multiple-origins`,
    /// where it must already have passed the allowlist.
    pub fn options(&self, request_origin: Option<&str>) -> CorsOptions {
        match self {
            CorsScenario::Basic => CorsOptions::default(),
            CorsScenario::CustomOrigin => CorsOptions::default().origin(CUSTOM_ORIGIN),
            CorsScenario::WithCredentials => CorsOptions::default().origin(CUSTOM_ORIGIN).credentials(true),
            CorsScenario::AdditionalHeaders => CorsOptions::default()
                .additional_headers(EXTRA_HEADERS.iter().copied())
                .additional_methods(["HEAD"]),
            CorsScenario::MultipleOrigins => CorsOptions::default()
                .origin(request_origin.unwrap_or(ALLOWED_ORIGINS[0]))
                .credentials(true),
        }
    }

    fn describe(&self, cors: Value, request_origin: Option<&str>) -> Value {
        match self {
            CorsScenario::Basic => json!({
                "scenario": self.as_str(),
                "description": "Default CORS headers with wildcard origin (*)",
                "headers": cors,
                "message": "This allows requests from any origin",
            }),
            CorsScenario::CustomOrigin => json!({
                "scenario": self.as_str(),
                "description": format!("CORS restricted to {}", CUSTOM_ORIGIN),
                "headers": cors,
                "message": format!("Only requests from {} are allowed", CUSTOM_ORIGIN),
            }),
            CorsScenario::WithCredentials => json!({
                "scenario": self.as_str(),
                "description": format!("CORS with credentials enabled for {}", CUSTOM_ORIGIN),
                "headers": cors,
                "message": "Allows cookies and authorization headers",
                "note": "Cannot use credentials with wildcard origin",
            }),
            CorsScenario::AdditionalHeaders => json!({
                "scenario": self.as_str(),
                "description": "CORS with additional custom headers and methods",
                "headers": cors,
                "message": "Includes custom headers and HEAD method",
                "customHeaders": EXTRA_HEADERS,
            }),
            CorsScenario::MultipleOrigins => json!({
                "scenario": self.as_str(),
                "description": "Validates origin against allowlist and returns specific origin",
                "allowedOrigins": ALLOWED_ORIGINS,
                "requestOrigin": request_origin,
                "headers": cors,
                "message": "Origin validated successfully",
                "note": "This pattern allows multiple origins while enabling credentials",
            }),
        }
    }
}

impl FromStr for CorsScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CorsScenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct ScenarioQuery {
    pub scenario: Option<String>,
}

pub async fn cors_sdk_demo(method: Method, headers: HeaderMap, Query(query): Query<ScenarioQuery>) -> Response {
    let requested = query.scenario.filter(|s| !s.is_empty());
    let scenario = match requested.as_deref().map(CorsScenario::from_str).unwrap_or(Ok(CorsScenario::Basic)) {
        Ok(scenario) => scenario,
        Err(unknown) => {
            tracing::debug!("Unknown CORS scenario: {}", unknown);
            let available: Vec<&str> = CorsScenario::ALL.iter().map(CorsScenario::as_str).collect();
            return with_cors(
                CorsOptions::default().headers(),
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid scenario",
                    "available_scenarios": available,
                })),
            );
        }
    };

    let request_origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());

    if scenario == CorsScenario::MultipleOrigins {
        if let Some(origin) = request_origin {
            if !ALLOWED_ORIGINS.contains(&origin) {
                tracing::warn!("Rejected request from origin {}", origin);
                return (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "error": "Origin not allowed",
                        "requestedOrigin": origin,
                        "allowedOrigins": ALLOWED_ORIGINS,
                    })),
                )
                    .into_response();
            }
        }
    }

    let options = scenario.options(request_origin);

    if method == Method::OPTIONS {
        return with_cors(options.headers(), StatusCode::OK, "ok");
    }

    let cors_json = match options.to_json() {
        Ok(value) => value,
        Err(e) => return cors_failure(e),
    };
    let mut response = with_cors(
        options.headers(),
        StatusCode::OK,
        Json(scenario.describe(cors_json, request_origin)),
    );
    if scenario == CorsScenario::AdditionalHeaders {
        response
            .headers_mut()
            .insert("x-custom-header", HeaderValue::from_static("example-value"));
    }
    response
}

fn with_cors(cors: Result<HeaderMap, CorsError>, status: StatusCode, body: impl IntoResponse) -> Response {
    match cors {
        Ok(cors) => (status, cors, body).into_response(),
        Err(e) => cors_failure(e),
    }
}

fn cors_failure(err: CorsError) -> Response {
    tracing::error!("Failed to build CORS headers: {}", err);
    crate::error::ApiError::internal("Internal server error").into_response()
}
