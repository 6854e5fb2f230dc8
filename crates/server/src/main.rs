//! HTTP server plus the background daily task generation service.

mod error;
mod routes;

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use axum::Router;
use db::DBService;
use services::services::{daily_tasks::DailyTaskService, gemini_api::GeminiApiClient};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub gemini: GeminiApiClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path =
        PathBuf::from(std::env::var("DATABASE_PATH").unwrap_or_else(|_| "snapquest.db".to_string()));
    let db = DBService::new(&db_path)
        .await
        .context("failed to open database")?;

    let gemini = GeminiApiClient::from_env().context("GEMINI_API_KEY must be set")?;

    DailyTaskService::spawn(db.clone(), gemini.clone()).await;

    let state = AppState { db, gemini };
    let app = Router::new()
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
