use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::error;

use levelup_types::api::UploadResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// 50 MB upload limit for artifacts
const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Artifact kind → storage directory. Mirrors the original container split
/// between worksheets and flashcards.
fn container_dir(kind: &str) -> Option<&'static str> {
    match kind {
        "worksheet" => Some("pdf-storage"),
        "flashcard" => Some("flashcards-storage"),
        _ => None,
    }
}

/// Reject anything that could escape the storage directory.
fn safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// POST /uploads/{kind}?filename= — raw artifact bytes in the body.
pub async fn upload(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<UploadQuery>,
    bytes: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let dir = container_dir(&kind).ok_or(ApiError::BadRequest("Invalid file type"))?;
    if !safe_filename(&query.filename) {
        return Err(ApiError::BadRequest("Invalid filename"));
    }
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty upload"));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge);
    }

    let target_dir = state.config.storage_root.join(dir);
    tokio::fs::create_dir_all(&target_dir).await.map_err(|e| {
        error!("Failed to create storage directory {}: {}", target_dir.display(), e);
        ApiError::internal(e)
    })?;

    let target = target_dir.join(&query.filename);
    let mut file = tokio::fs::File::create(&target).await.map_err(|e| {
        error!("Failed to create file {}: {}", target.display(), e);
        ApiError::internal(e)
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", target.display(), e);
        ApiError::internal(e)
    })?;

    let base = state.config.public_url.trim_end_matches('/');
    Ok(Json(UploadResponse {
        url: format!("{base}/uploads/{kind}/{}", query.filename),
        size: bytes.len() as u64,
    }))
}

/// GET /uploads/{kind}/{filename} — stream the stored artifact back.
pub async fn download(
    State(state): State<AppState>,
    Path((kind, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let dir = container_dir(&kind).ok_or(ApiError::BadRequest("Invalid file type"))?;
    if !safe_filename(&filename) {
        return Err(ApiError::BadRequest("Invalid filename"));
    }

    let path = state.config.storage_root.join(dir).join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("File not found"))?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_kinds_map_to_directories() {
        assert_eq!(container_dir("worksheet"), Some("pdf-storage"));
        assert_eq!(container_dir("flashcard"), Some("flashcards-storage"));
        assert_eq!(container_dir("video"), None);
    }

    #[test]
    fn traversal_attempts_are_rejected() {
        assert!(safe_filename("algebra-basics.pdf"));
        assert!(!safe_filename(""));
        assert!(!safe_filename("../secrets"));
        assert!(!safe_filename("a/b.pdf"));
        assert!(!safe_filename("a\\b.pdf"));
        assert!(!safe_filename(".hidden"));
    }
}
