use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    error::{AppError, Result},
    models::user::{
        JwtResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenRefreshResponse,
    },
    AppState,
};

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<JwtResponse>> {
    // Registration stores the trimmed name.
    let res = state.auth.login(body.username.trim(), &body.password).await?;
    Ok(Json(res))
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<JwtResponse>)> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username must not be blank".into()));
    }
    if body.password.trim().is_empty() {
        return Err(AppError::BadRequest("Password must not be blank".into()));
    }

    let res = state.auth.register(username, &body.password).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenRefreshResponse>> {
    let res = state.auth.refresh(&body.refresh_token).await?;
    Ok(Json(res))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<Value>> {
    state.auth.logout(&body.refresh_token).await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}
