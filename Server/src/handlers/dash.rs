// handlers/dash.rs

use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, instrument};

use crate::types::AppState;

const DASH_MIME_TYPE: &str = "application/dash+xml";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[instrument(skip_all)]
pub async fn fetch_dash_segment(
    State(app_state): State<AppState>,
    Path((repr_id, fragment)): Path<(String, String)>,
) -> Response {
    let relative_path = match app_state.engine.resolve_fragment(&repr_id, &fragment) {
        Ok(path) => path,
        Err(e) => {
            debug!("{}", e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let path = app_state.base_dir.join(&relative_path);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Fragment file {:?} does not exist", path);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            error!("Failed to open fragment {:?}: {}", path, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let length = match file.metadata().await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        Ok(_) => {
            debug!("Fragment path {:?} is not a file", path);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            error!("Failed to stat fragment {:?}: {}", path, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = app_state
        .engine
        .mime_type(&repr_id)
        .unwrap_or(FALLBACK_MIME_TYPE)
        .to_string();

    debug!("Serving {} ({} bytes)", relative_path, length);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

#[instrument(skip_all)]
pub async fn fetch_dash_mpd(
    State(app_state): State<AppState>,
    Path(manifest_name): Path<String>,
) -> Response {
    // Any `<name>.mpd` gets the one looped manifest.
    if manifest_name.strip_suffix(".mpd").is_none() {
        debug!("Not a manifest request: {}", manifest_name);
        return StatusCode::NOT_FOUND.into_response();
    }

    match app_state.engine.serialize() {
        Ok(xml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, DASH_MIME_TYPE)],
            xml,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to serialize MPD: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
