use anyhow::Context;
use tracing_subscriber::EnvFilter;

use edge_playground::{app, config, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edge_playground=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting Edge Playground in {:?} mode", config.environment);
    if edge_playground::is_development!() && std::env::var("JWT_SECRET").is_err() {
        tracing::warn!("JWT_SECRET not set; accepting tokens signed with the local development secret");
    }

    let state = AppState::from_config(config.clone()).await?;
    let app = app(state).context("invalid CORS configuration")?;

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Edge Playground listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
