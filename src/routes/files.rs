use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};

use crate::{
    error::{AppError, Result},
    models::{auth::Principal, user::StoredFileResponse},
    AppState,
};

/// POST /files — multipart upload, field `file`.
pub async fn upload_file(
    State(state): State<AppState>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredFileResponse>)> {
    let mut file_data: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("file").to_string();
            let bytes = field.bytes().await?.to_vec();
            file_data = Some((bytes, filename));
        }
    }

    let (bytes, original_name) =
        file_data.ok_or_else(|| AppError::BadRequest("No file field in upload".into()))?;

    let handle = state.files.store(&bytes, &original_name).await?;
    let content_type = state.files.content_type(&handle).await?;
    tracing::info!(user_id = %principal.user_id, size = bytes.len(), "File stored");

    Ok((
        StatusCode::CREATED,
        Json(StoredFileResponse {
            handle,
            size: bytes.len() as u64,
            content_type,
        }),
    ))
}

/// GET /files/{handle}
pub async fn download_file(
    State(state): State<AppState>,
    _principal: Principal,
    Path(handle): Path<String>,
) -> Result<Response> {
    let content_type = state.files.content_type(&handle).await?;
    let bytes = state.files.read(&handle).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.into()))
}

/// DELETE /files/{handle}
pub async fn delete_file(
    State(state): State<AppState>,
    principal: Principal,
    Path(handle): Path<String>,
) -> Result<StatusCode> {
    if state.files.delete(&handle).await? {
        tracing::info!(user_id = %principal.user_id, "File deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
