//! Course Sync development server
//!
//! Serves the course CRUD API from memory so the `course` CLI can pull and
//! push against it. Contents are lost when the process exits.
//!
//! # Configuration
//!
//! Environment variables:
//! - `COURSESYNC_PORT`: Port to listen on (default: 8080)
//! - `COURSESYNC_API_TOKEN`: Bearer token required on CRUD routes (default: none, open access)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /courses/{id}/sections`, `POST /sections`, `PUT|DELETE /sections/{id}`
//! - `GET /sections/{id}/lessons`, `POST /lessons`, `PUT|DELETE /lessons/{id}`
//! - `GET /lessons/{id}/questions`, `POST /questions`, `PUT|DELETE /questions/{id}`
//! - `GET /questions/{id}/answers`, `POST /answers`, `PUT|DELETE /answers/{id}`

use std::net::SocketAddr;

use coursesync::config::Config;
use coursesync::server::{router, AppState};
use coursesync_core::MemoryCourseApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "coursesync=info,coursesync_server=info,coursesync_core=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> std::io::Result<()> {
    if config.api_token.is_none() {
        tracing::warn!("COURSESYNC_API_TOKEN not set - CRUD routes are open");
    }

    let state = AppState::new(MemoryCourseApi::new(), config.api_token);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
