//! JSON surface over the post service.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use crate::application::posts::PostService;
use crate::config::ServerSettings;
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
    /// Used when a request does not say whether to include pages.
    pub include_pages: bool,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/{id}/blocks", get(handlers::post_blocks))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::trace_requests))
}

/// Bind the listener and serve until Ctrl-C.
pub async fn serve(settings: &ServerSettings, state: HttpState) -> Result<(), InfraError> {
    let listener = TcpListener::bind(settings.addr).await?;
    info!(addr = %settings.addr, "listening");

    axum::serve(listener, build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
