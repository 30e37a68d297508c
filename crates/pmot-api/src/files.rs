use std::path::Path;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use uuid::Uuid;

use pmot_types::api::UploadResponse;

use crate::{ApiError, AppState};

/// 50 MB upload limit for files
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Request body limit for `/upload/`: one file plus multipart framing.
pub const MAX_UPLOAD_BODY: usize = MAX_FILE_SIZE + 64 * 1024;

const MAX_EXTENSION_LEN: usize = 10;

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// Name a stored upload: a fresh UUID plus the client's extension, if it is a
/// plain short alphanumeric one. The client's path never reaches the disk.
pub fn stored_file_name(original: Option<&str>) -> String {
    let id = Uuid::new_v4();
    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// POST /upload/: multipart form with a `file` field. Saves the file under
/// the upload directory and returns the URL it is served from.
pub async fn upload_file(
    State(state): State<AppState>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let name = stored_file_name(field.file_name());
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("empty file".into()));
        }
        if bytes.len() > MAX_FILE_SIZE {
            return Err(ApiError::PayloadTooLarge);
        }

        tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
            error!("Failed to create upload directory {}: {}", state.upload_dir.display(), e);
            ApiError::Internal(e.into())
        })?;

        let file_path = state.upload_dir.join(&name);
        let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
            error!("Failed to create file {}: {}", file_path.display(), e);
            ApiError::Internal(e.into())
        })?;
        file.write_all(&bytes).await.map_err(|e| {
            error!("Failed to write file {}: {}", file_path.display(), e);
            ApiError::Internal(e.into())
        })?;
        file.flush().await.map_err(|e| ApiError::Internal(e.into()))?;

        info!("Stored upload {} ({} bytes)", name, bytes.len());
        return Ok(Json(UploadResponse {
            url: format!("/uploads/{}", name),
        }));
    }

    Err(ApiError::BadRequest("missing `file` field".into()))
}
