//! HTTP serving layer.
//!
//! A thin axum surface over [`RetrievalEngine`]: uploads go through the
//! extraction layer into the store, questions go through retrieval and a
//! completion client. All state lives in [`AppState`]; the engine sits behind
//! an async `RwLock` so concurrent questions share a read lock while uploads
//! take the write lock.

mod routes;

pub use routes::{AnswerResponse, AskRequest, UploadResponse};

use crate::config::Settings;
use crate::embedding::FastEmbedProvider;
use crate::retriever::RetrievalEngine;
use anyhow::Context;
use axum::Router;
use axum::routing::{delete, get, post};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<RetrievalEngine>>,
    pub settings: Arc<Settings>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/upload_batch", post(routes::upload_batch))
        .route("/ask", post(routes::ask))
        .route("/collections", get(routes::collections))
        .route("/clear/{collection}", delete(routes::clear))
        .route("/clear_all", delete(routes::clear_all))
        .route("/document/{collection}/{filename}", delete(routes::remove_document))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the server and runs until ctrl-c.
pub async fn serve(settings: Settings, bind: Option<String>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());

    info!(model = %settings.embedding.model, "loading embedding model");
    let embedding = settings.embedding.clone();
    let provider = tokio::task::spawn_blocking(move || {
        FastEmbedProvider::new(&embedding.model, embedding.cache_dir.as_deref())
    })
    .await
    .context("embedding model initialization task panicked")??;

    let engine = RetrievalEngine::new(Arc::new(provider), &settings.chunking);
    let state = AppState {
        engine: Arc::new(RwLock::new(engine)),
        settings: Arc::new(settings),
    };

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(address = %bind, "document QA server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {e}");
        return;
    }
    info!("shutdown signal received");
}
