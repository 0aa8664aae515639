//! HTTP layer: router, shared context and server lifecycle.

use crate::cleanup;
use crate::config::Config;
use crate::stats::StatsStore;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use convertaphile_av::{tools, ToolPaths};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod routes;

/// Uploads are media files; allow up to 1 GiB per request.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub tools: Arc<ToolPaths>,
    /// Scratch space for uploads and intermediate outputs.
    pub temp_dir: PathBuf,
    /// Store of converted files awaiting download.
    pub converted_dir: PathBuf,
    pub stats: Arc<StatsStore>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/conversion", post(routes::convert_upload))
        .route("/download/{conversion_id}", get(routes::download))
        .route("/stats", get(routes::stats))
        .route("/tools", get(routes::tool_status))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Resolve directories, tools and the stats store from config.
pub fn build_context(config: &Config) -> Result<AppContext> {
    let base_dir = std::env::temp_dir().join("convertaphile");

    let temp_dir = config
        .storage
        .temp_dir
        .clone()
        .unwrap_or_else(|| base_dir.join("uploads"));
    let converted_dir = config
        .storage
        .converted_dir
        .clone()
        .unwrap_or_else(|| base_dir.join("converted_files"));

    std::fs::create_dir_all(&temp_dir)
        .with_context(|| format!("Failed to create temp dir {:?}", temp_dir))?;
    std::fs::create_dir_all(&converted_dir)
        .with_context(|| format!("Failed to create converted dir {:?}", converted_dir))?;

    // Stats live next to the converted store so the sweeper never sees them.
    let stats_path = converted_dir
        .parent()
        .map(|p| p.join("convertaphile-stats.json"));
    let stats = Arc::new(StatsStore::new(stats_path));

    let tools = ToolPaths {
        ffmpeg: resolve_tool("ffmpeg", config.tools.ffmpeg_path.as_deref()),
        ffprobe: resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref()),
    };
    tracing::info!(
        "using ffmpeg at {:?}, ffprobe at {:?}",
        tools.ffmpeg,
        tools.ffprobe
    );

    Ok(AppContext {
        config: Arc::new(config.clone()),
        tools: Arc::new(tools),
        temp_dir,
        converted_dir,
        stats,
    })
}

/// A missing tool is not fatal at boot; conversions fail cleanly until it
/// is installed, and /tools reports the gap.
fn resolve_tool(name: &str, configured: Option<&std::path::Path>) -> PathBuf {
    match tools::get_tool_path(name, configured) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("{}; conversions will fail until {} is available", e, name);
            PathBuf::from(name)
        }
    }
}

/// Serve requests on an already-bound listener until shutdown.
pub async fn serve_on(ctx: AppContext, listener: TcpListener) -> Result<()> {
    let cleanup_handle = cleanup::start_cleanup_task(
        ctx.converted_dir.clone(),
        Duration::from_secs(ctx.config.storage.retention_secs),
        Duration::from_secs(ctx.config.storage.cleanup_interval_secs),
    );

    let app = create_router(ctx);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error");

    cleanup_handle.abort();
    result
}

/// Bind and serve per config.
pub async fn start_server(config: Config) -> Result<()> {
    let ctx = build_context(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    serve_on(ctx, listener).await
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to install shutdown signal handler: {}", e);
    } else {
        tracing::info!("shutdown signal received");
    }
}
