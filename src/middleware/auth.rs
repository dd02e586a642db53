use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{
    error::AppError, models::auth::Principal, services::metrics::GATEWAY_REJECTIONS_COUNTER,
    AppState,
};

const BEARER_PREFIX: &str = "Bearer ";

/// Bearer-token gateway applied to every request.
///
/// Public paths pass through with no principal. Everything else needs a valid
/// access token; the resulting `Principal` is stored in request extensions.
/// Clients only ever see 401; the precise reason is logged.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_owned();

    if is_public(&path, &state.config.public_path_prefixes) {
        debug!(%path, "Public path, skipping authentication");
        return Ok(next.run(request).await);
    }

    let outcome = bearer_token(request.headers()).map(|t| state.tokens.verify_access_token(t));

    match outcome {
        None => {
            debug!(%path, token_present = false, "Rejecting request without bearer token");
            GATEWAY_REJECTIONS_COUNTER
                .with_label_values(&["missing_token"])
                .inc();
            Err(AppError::Unauthenticated)
        }
        Some(Err(e)) => {
            warn!(%path, token_present = true, reason = e.reason(), "Rejecting invalid access token");
            GATEWAY_REJECTIONS_COUNTER
                .with_label_values(&[e.reason()])
                .inc();
            Err(AppError::Unauthenticated)
        }
        Some(Ok(principal)) => {
            debug!(%path, user_id = %principal.user_id, "Authenticated request");
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
    }
}

/// The token after an exact `"Bearer "` prefix, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty())
}

pub fn is_public(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_str()))
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
