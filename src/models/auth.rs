use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in the signed access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    /// Expiry in epoch milliseconds; `exp` only carries whole seconds.
    pub exp_ms: i64,
}

/// Identity projected from a verified access token.
///
/// Inserted into request extensions by the auth middleware and available to
/// handlers as an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}
