use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::get,
    Router,
};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;

#[cfg(test)]
mod integration_tests;

use config::AppConfig;
use state::AppState;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = match config.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            tracing::warn!("Ignoring invalid CORS_ORIGIN, allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn build_app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/", get(root))
        .merge(routes::create_router())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(axum::middleware::from_fn(middleware::request_log::log_requests))
        .layer(cors_layer(&config))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Billdesk backend...");

    let config = AppConfig::from_env();

    let pool = match db::init_pool(&config.database_url).await {
        Ok(pool) => {
            tracing::info!("Database connection established");
            pool
        }
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            return;
        }
    };

    if let Err(e) = db::init_database(&pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        return;
    }

    let port = config.port;
    let app = build_app(AppState::new(pool, config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };

    tracing::info!("listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}

async fn root() -> &'static str {
    "Billdesk API is running"
}
