//! services/api/src/web/files.rs
//!
//! Upload, listing and deletion of specification documents.

use crate::ingestion::{IngestError, UploadedFile};
use crate::web::{
    error::{ErrorBody, HttpError},
    rest::{parse_id, FileResponse, MessageResponse},
    state::AppState,
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use testgen_core::domain::MAX_FILES_PER_UPLOAD;
use tracing::{info, warn};

const UPLOAD_FIELD: &str = "files";

/// Reads every `files` part of the form, failing once the per-request limit is exceeded.
async fn collect_uploads(mut multipart: Multipart) -> Result<Vec<UploadedFile>, HttpError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if uploads.len() == MAX_FILES_PER_UPLOAD {
            return Err(HttpError::bad_request(format!(
                "Too many files. Maximum is {} files per upload.",
                MAX_FILES_PER_UPLOAD
            )));
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        uploads.push(UploadedFile {
            name,
            mime_type,
            data: data.to_vec(),
        });
    }
    Ok(uploads)
}

#[utoipa::path(
    post,
    path = "/api/files/upload",
    request_body(content_type = "multipart/form-data", description = "Up to 10 documents in the `files` field."),
    responses(
        (status = 201, description = "Files stored", body = [FileResponse]),
        (status = 400, description = "No files, too many files, or a rejected file. Accepted files in the same batch are still stored.", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn upload_files_handler(
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let uploads = collect_uploads(multipart?).await?;
    if uploads.is_empty() {
        return Err(HttpError::bad_request("No files uploaded"));
    }

    let mut stored = Vec::with_capacity(uploads.len());
    let mut rejected = Vec::new();
    for upload in uploads {
        let name = upload.name.clone();
        match app_state.ingestor.ingest(upload).await {
            Ok(file) => stored.push(FileResponse::from(file)),
            Err(IngestError::Rejected(reason)) => rejected.push(format!("{}: {}", name, reason)),
            Err(IngestError::Storage(e)) => {
                return Err(HttpError::internal("File upload failed", e))
            }
        }
    }

    if !rejected.is_empty() {
        warn!(
            stored = stored.len(),
            rejected = rejected.len(),
            "Rejected uploaded files"
        );
        return Err(HttpError::bad_request(rejected.join("; ")));
    }

    info!(count = stored.len(), "Upload complete");
    Ok((StatusCode::CREATED, Json(stored)))
}

#[utoipa::path(
    get,
    path = "/api/files",
    responses(
        (status = 200, description = "All stored files", body = [FileResponse]),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn list_files_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<FileResponse>>, HttpError> {
    let files = app_state
        .db
        .get_all_files()
        .await
        .map_err(|e| HttpError::internal("Failed to fetch files", e))?;
    Ok(Json(files.into_iter().map(FileResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    params(("id" = i32, Path, description = "File id")),
    responses(
        (status = 200, description = "File deleted (or already absent)", body = MessageResponse),
        (status = 400, description = "Id is not an integer", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn delete_file_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, HttpError> {
    let id = parse_id(&id, "Invalid file ID")?;
    let removed = app_state
        .ingestor
        .remove(id)
        .await
        .map_err(|e| HttpError::internal("Failed to delete file", e))?;
    if removed.is_some() {
        info!(file_id = id, "Deleted file");
    }
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
