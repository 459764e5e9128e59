pub mod auth;
pub mod cli;
pub mod config;
pub mod cors;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod storage;
pub mod types;

use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::cors::CorsError;
use crate::handlers::{preflight, protected, public};
use crate::state::AppState;

/// Build the HTTP application.
///
/// Every route shares the configured CORS layer except `cors-sdk-demo`, which sets its own
/// headers per scenario.
pub fn app(state: AppState) -> Result<Router, CorsError> {
    let shared_cors = cors::shared_layer(&state.config.security)?;

    let shared = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(function_routes())
        .layer(shared_cors);

    Ok(Router::new()
        .merge(shared)
        .route("/functions/v1/cors-sdk-demo", any(public::cors_sdk_demo))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .with_state(state))
}

fn function_routes() -> Router<AppState> {
    Router::new()
        // Protected
        .route(
            "/functions/v1/db-ops",
            post(protected::db_ops)
                .options(preflight)
                .fallback(handlers::post_only),
        )
        .route("/functions/v1/all-http-methods", any(protected::all_http_methods))
        .route("/functions/v1/delete-method", any(protected::delete_method))
        .route(
            "/functions/v1/get-claims-demo",
            get(protected::get_claims_demo)
                .post(protected::get_claims_demo)
                .options(preflight),
        )
        // Public
        .route(
            "/functions/v1/generate-upload-url",
            post(public::generate_upload_url)
                .options(preflight)
                .fallback(handlers::post_only),
        )
        .route("/functions/v1/test-sdk-version", get(public::test_sdk_version))
}
