use std::path::Path;
use std::sync::Arc;
use anyhow::Context;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
pub use error::ApiError;
use crate::config::{ApiConfig, BlobBackend, Config};
use crate::service::ProjectService;

mod error;
mod controllers;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct ApiContext {
    pub cfg: Arc<ApiConfig>,
    pub service: Arc<ProjectService>,
}

/// The full HTTP application. `blob_dir` is served under `/blobs` when set.
pub fn app(ctx: ApiContext, blob_dir: Option<&Path>) -> Router {
    let mut router = controllers::router(ctx.cfg.max_upload_bytes);
    if let Some(blob_dir) = blob_dir {
        router = router.nest_service("/blobs", ServeDir::new(blob_dir));
    }
    router
        .layer(CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any))
        .layer(
            ServiceBuilder::new()
                .layer(Extension(ctx))
                .layer(TraceLayer::new_for_http()),
        )
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let service = Arc::new(ProjectService::open(&config).await?);
    let blob_dir = (config.blob.backend == BlobBackend::Local).then(|| config.blob.blob_dir.clone());
    let ctx = ApiContext {
        cfg: Arc::new(config.api.clone()),
        service: service.clone(),
    };
    let app = app(ctx, blob_dir.as_deref());

    let addr = config.api.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await.context("failed to bind to address")?;
    info!("listening on {}", &addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("error running HTTP server")?;

    info!("shutting down");
    service.storage().close().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
