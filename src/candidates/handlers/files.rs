// src/candidates/handlers/files.rs
//! File serving for locally stored application documents

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::common::config::StorageKind;
use crate::common::{ApiError, AppState};
use crate::services::storage::StorageError;

/// GET /storage/*path - Serve CVs and cover letters written by the local store
pub async fn serve_stored_file(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.config.storage_kind != StorageKind::Local {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let content = state.storage.read(&path).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidPath(_) => {
            ApiError::NotFound("File not found".to_string())
        }
        other => ApiError::Storage(other.to_string()),
    })?;

    let content_type = if path.ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    };

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], content))
}
