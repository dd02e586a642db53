//! Application error types with consistent API responses.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::{
    auth::AuthError,
    file_storage::FileStoreError,
    tokens::TokenError,
};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid refresh token")]
    RefreshTokenInvalid,

    #[error("Invalid username or password")]
    CredentialsInvalid,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::RefreshTokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "invalid_refresh_token",
                Some("Invalid refresh token".to_string()),
            ),
            AppError::CredentialsInvalid => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                Some("Invalid username or password".to_string()),
            ),
            AppError::UsernameTaken => (
                StatusCode::BAD_REQUEST,
                "username_taken",
                Some("Username is already taken".to_string()),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone())),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", None),
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::CredentialsInvalid => AppError::CredentialsInvalid,
            AuthError::UsernameTaken => AppError::UsernameTaken,
            AuthError::RefreshTokenInvalid => AppError::RefreshTokenInvalid,
            AuthError::Token(e) => e.into(),
            AuthError::Store(e) => AppError::Internal(e.into()),
            AuthError::Hashing(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(e) => AppError::Internal(e.into()),
            _ => AppError::Unauthenticated,
        }
    }
}

impl From<FileStoreError> for AppError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::InvalidPath(msg) => AppError::BadRequest(msg),
            // Handles arrive from clients; one that does not decrypt names no file.
            FileStoreError::NotFound | FileStoreError::Cipher(_) => AppError::NotFound,
            FileStoreError::EscapesRoot => {
                AppError::Storage("file handle resolves outside the storage root".into())
            }
            FileStoreError::Io(e) => AppError::Storage(e.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
