//! Server initialization and routing
//!
//! Builds the two routers, applies the shared middleware stack and runs them
//! with graceful shutdown.

use crate::config::{EmbeddingConfig, TranscriptionConfig};
use crate::middleware::{log_requests, request_id};
use crate::routes::{embed, health, index, not_found, search, transcribe};
use crate::state::{EmbeddingState, TranscriptionState};
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Router of the transcription service
pub fn transcription_router(state: TranscriptionState) -> Router {
    let enable_cors = state.config.enable_cors;
    let max_body = state.config.max_body_size();

    let routes = Router::new()
        .route("/health", get(health::transcription_health))
        .route("/transcribe", post(transcribe::transcribe_audio))
        .route("/models", get(transcribe::list_models))
        .fallback(not_found)
        .with_state(state);

    with_common_layers(routes, enable_cors, max_body)
}

/// Router of the embedding & search service
pub fn embedding_router(state: EmbeddingState) -> Router {
    let enable_cors = state.config.enable_cors;
    let max_body = state.config.max_body_size();

    let routes = Router::new()
        .route("/health", get(health::embedding_health))
        .route("/embed", post(embed::embed_segments))
        .route("/index", post(index::index_embeddings))
        .route("/search", post(search::search_segments))
        .route("/clear", post(index::clear_index))
        .fallback(not_found)
        .with_state(state);

    with_common_layers(routes, enable_cors, max_body)
}

/// Middleware stack, outermost first: tracing, request ID, request logging,
/// CORS, body limit.
fn with_common_layers(router: Router, enable_cors: bool, max_body: usize) -> Router {
    let cors = if enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(request_id))
            .layer(from_fn(log_requests))
            .layer(cors)
            .layer(DefaultBodyLimit::max(max_body)),
    )
}

/// Install the JSON tracing subscriber.
pub fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

/// Start the transcription service
///
/// Serves immediately; the speech model loads in the background and
/// `/health` reports when it is ready.
pub async fn start_transcription_server(config: TranscriptionConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level)?;

    let addr = config.socket_addr()?;
    tracing::info!(
        model = %config.whisper_model,
        model_dir = %config.model_dir.display(),
        "Starting transcription service on {addr}"
    );

    let state = TranscriptionState::new(config);
    state.spawn_preload();

    serve(transcription_router(state), addr).await
}

/// Start the embedding & search service
///
/// Loads the embedding model and the persisted index before binding; a
/// model that cannot load or an index that fails validation stops startup.
pub async fn start_embedding_server(config: EmbeddingConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level)?;

    let addr = config.socket_addr()?;
    tracing::info!(
        model = %config.embedding_model,
        mode = ?config.embedding_mode,
        index = %config.faiss_index_path.display(),
        metadata = %config.metadata_path.display(),
        "Starting embedding service on {addr}"
    );

    let state = EmbeddingState::load(config).await?;

    serve(embedding_router(state), addr).await
}

async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
