//! Read-only browser over the txt2img output folders, plus image deletion.

mod error;
mod metadata;
mod routes;
mod views;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::GallerySettings;
use crate::storage::StorageLayout;

pub use error::GalleryError;
pub use metadata::{format_parameters, read_parameters};

#[derive(Clone)]
pub struct GalleryState {
    storage: Arc<StorageLayout>,
    images_root: PathBuf,
}

impl GalleryState {
    pub fn new(storage: StorageLayout) -> Self {
        let images_root = storage.images_path();
        Self {
            storage: Arc::new(storage),
            images_root,
        }
    }
}

pub fn router(state: GalleryState) -> Router {
    let static_files = ServeDir::new(&state.images_root);
    Router::new()
        .route("/", get(routes::index))
        .route("/delete", post(routes::delete_image))
        .route("/:folder", get(routes::folder))
        .route("/:folder/:image", get(routes::image))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C / SIGTERM.
pub async fn serve(settings: &GallerySettings, storage: StorageLayout) -> Result<()> {
    storage.ensure_directory(&storage.images_path())?;

    let app = router(GalleryState::new(storage));
    let addr = settings.socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind gallery to {addr}"))?;
    tracing::info!("Gallery listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gallery server")?;

    tracing::info!("Gallery stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!("Failed to listen for SIGTERM: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
