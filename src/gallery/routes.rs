use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error::GalleryError, metadata, views, GalleryState};

pub async fn index(State(state): State<GalleryState>) -> Result<Html<String>, GalleryError> {
    let folders = state.storage.list_folders(&state.images_root)?;
    Ok(Html(views::index_page(&folders)))
}

pub async fn folder(
    State(state): State<GalleryState>,
    Path(folder): Path<String>,
) -> Result<Html<String>, GalleryError> {
    let dir = resolve(&state.images_root, &[&folder])
        .filter(|dir| dir.is_dir())
        .ok_or_else(|| GalleryError::not_found(format!("no folder named `{folder}`")))?;
    let images = state.storage.list_images(&dir)?;
    Ok(Html(views::folder_page(&folder, &images)))
}

pub async fn image(
    State(state): State<GalleryState>,
    Path((folder, image)): Path<(String, String)>,
) -> Result<Response, GalleryError> {
    let Some(path) = resolve(&state.images_root, &[&folder, &image]).filter(|p| p.is_file())
    else {
        return Ok(Redirect::to("/").into_response());
    };

    let parameters = tokio::task::spawn_blocking(move || metadata::read_parameters(&path))
        .await
        .map_err(|err| GalleryError::internal(err.to_string()))?
        .unwrap_or_else(|error| {
            tracing::warn!("Unable to read image metadata: {error:#}");
            None
        })
        .map(|raw| metadata::format_parameters(&raw));

    Ok(Html(views::image_page(&folder, &image, parameters.as_deref())).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteRequest {
    pub folder: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DeleteResponse {
    pub status: &'static str,
}

impl DeleteResponse {
    fn success() -> Json<Self> {
        Json(Self { status: "success" })
    }

    fn error() -> Json<Self> {
        Json(Self { status: "error" })
    }
}

pub async fn delete_image(
    State(state): State<GalleryState>,
    Json(request): Json<DeleteRequest>,
) -> Json<DeleteResponse> {
    let (Some(folder), Some(image)) = (request.folder, request.image) else {
        return DeleteResponse::error();
    };
    let Some(path) = resolve(&state.images_root, &[&folder, &image]).filter(|p| p.is_file())
    else {
        return DeleteResponse::error();
    };

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Deleted image");
            DeleteResponse::success()
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), "Unable to delete image: {error}");
            DeleteResponse::error()
        }
    }
}

/// Joins single path segments under `root`, refusing anything that could
/// escape it.
fn resolve(root: &FsPath, segments: &[&str]) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in segments {
        let mut components = FsPath::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return None,
        }
    }
    Some(path)
}
