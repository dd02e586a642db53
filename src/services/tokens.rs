use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{RefreshTokenStore, StoreError},
    models::{
        auth::{Claims, Principal},
        user::RefreshToken,
    },
    services::{auth::AuthError, credentials::CredentialVerifier},
};

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Why an access token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token signature")]
    Invalid,
    #[error("Token expired")]
    Expired,
    #[error("Malformed token")]
    Malformed,
    #[error("Failed to sign token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

impl TokenError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Invalid => "invalid_signature",
            TokenError::Expired => "expired",
            TokenError::Malformed => "malformed",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::Invalid,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::InvalidAlgorithmName => TokenError::Malformed,
            _ => TokenError::Invalid,
        }
    }
}

/// Signing secret and lifetimes for issued tokens.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_ttl: Duration::milliseconds(config.jwt_expiration_ms),
            refresh_ttl: Duration::milliseconds(config.refresh_token_expiration_ms),
        }
    }
}

/// Mints signed access tokens and opaque refresh tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    credentials: Arc<CredentialVerifier>,
}

impl TokenIssuer {
    pub fn new(
        settings: &TokenSettings,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        credentials: Arc<CredentialVerifier>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
            refresh_tokens,
            credentials,
        }
    }

    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;
        let claims = Claims {
            sub: principal.user_id.to_string(),
            username: principal.username.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            exp_ms: expires_at.timestamp_millis(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key).map_err(TokenError::Encoding)
    }

    /// Signature first, then expiry. A token is dead once `now >= exp_ms`.
    pub fn verify_access_token(&self, token: &str) -> Result<Principal, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below without leeway.
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;
        if Utc::now().timestamp_millis() >= claims.exp_ms {
            return Err(TokenError::Expired);
        }

        let user_id: Uuid = claims.sub.parse().map_err(|_| TokenError::Malformed)?;
        Ok(Principal {
            user_id,
            username: claims.username,
        })
    }

    /// Persists a fresh random token for the principal and returns its raw value.
    pub async fn issue_refresh_token(&self, principal: &Principal) -> Result<String, StoreError> {
        let now = Utc::now();
        let record = RefreshToken {
            id: Uuid::new_v4(),
            token: Uuid::new_v4().to_string(),
            user_id: principal.user_id,
            expires_at: now + self.refresh_ttl,
            created_at: now,
        };
        self.refresh_tokens.insert(&record).await?;
        Ok(record.token)
    }

    pub async fn verify_refresh_token(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.live_refresh_token(token).await?.is_some())
    }

    /// Issues a new access token for the owner of a live refresh token.
    /// The refresh token itself stays valid.
    pub async fn rotate_access_token(&self, refresh_token: &str) -> Result<String, AuthError> {
        let record = self
            .live_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::RefreshTokenInvalid)?;

        let principal = self
            .credentials
            .find_principal(record.user_id)
            .await?
            .ok_or(AuthError::RefreshTokenInvalid)?;

        Ok(self.issue_access_token(&principal)?)
    }

    pub async fn invalidate_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        if self.refresh_tokens.delete_by_token(token).await? {
            tracing::debug!("Refresh token invalidated");
        }
        Ok(())
    }

    /// Looks the token up, deleting it on the way if it has expired.
    async fn live_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        let Some(record) = self.refresh_tokens.find_by_token(token).await? else {
            return Ok(None);
        };
        if record.is_expired_at(Utc::now()) {
            self.refresh_tokens.delete_by_token(token).await?;
            tracing::info!(user_id = %record.user_id, "Removed expired refresh token on read");
            return Ok(None);
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryRefreshTokenStore, InMemoryUserStore};

    struct Fixture {
        issuer: TokenIssuer,
        store: Arc<InMemoryRefreshTokenStore>,
        credentials: Arc<CredentialVerifier>,
    }

    fn fixture_with(secret: &str, access_ttl: Duration) -> Fixture {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let credentials = Arc::new(CredentialVerifier::new(
            Arc::new(InMemoryUserStore::new()),
            4,
        ));
        let settings = TokenSettings {
            secret: secret.to_string(),
            access_ttl,
            refresh_ttl: Duration::hours(1),
        };
        Fixture {
            issuer: TokenIssuer::new(&settings, store.clone(), credentials.clone()),
            store,
            credentials,
        }
    }

    fn fixture() -> Fixture {
        fixture_with("unit-test-secret", Duration::minutes(5))
    }

    fn principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let f = fixture();
        let p = principal();
        let token = f.issuer.issue_access_token(&p).unwrap();
        assert_eq!(f.issuer.verify_access_token(&token).unwrap(), p);
    }

    #[test]
    fn test_expired_access_token() {
        let f = fixture_with("unit-test-secret", Duration::zero());
        let token = f.issuer.issue_access_token(&principal()).unwrap();
        assert!(matches!(
            f.issuer.verify_access_token(&token).unwrap_err(),
            TokenError::Expired
        ));

        let f = fixture_with("unit-test-secret", Duration::minutes(-10));
        let token = f.issuer.issue_access_token(&principal()).unwrap();
        assert!(matches!(
            f.issuer.verify_access_token(&token).unwrap_err(),
            TokenError::Expired
        ));
    }

    #[test]
    fn test_sub_second_ttl_is_honoured() {
        let f = fixture_with("unit-test-secret", Duration::milliseconds(900));
        let p = principal();
        for _ in 0..200 {
            let token = f.issuer.issue_access_token(&p).unwrap();
            assert_eq!(f.issuer.verify_access_token(&token).unwrap(), p);
        }
    }

    #[test]
    fn test_access_token_expires_at_millisecond_deadline() {
        let f = fixture_with("unit-test-secret", Duration::milliseconds(200));
        let token = f.issuer.issue_access_token(&principal()).unwrap();
        assert!(f.issuer.verify_access_token(&token).is_ok());

        std::thread::sleep(std::time::Duration::from_millis(250));
        assert!(matches!(
            f.issuer.verify_access_token(&token).unwrap_err(),
            TokenError::Expired
        ));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&principal()).unwrap();

        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            f.issuer.verify_access_token(&tampered).unwrap_err(),
            TokenError::Invalid
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let f = fixture();
        let token = f.issuer.issue_access_token(&principal()).unwrap();

        let payload_start = token.find('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[payload_start + 3] = if bytes[payload_start + 3] == b'x' { b'y' } else { b'x' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(f.issuer.verify_access_token(&tampered).is_err());
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = fixture_with("secret-one", Duration::minutes(5))
            .issuer
            .issue_access_token(&principal())
            .unwrap();
        let err = fixture_with("secret-two", Duration::minutes(5))
            .issuer
            .verify_access_token(&token)
            .unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn test_malformed_token() {
        let f = fixture();
        for garbage in ["", "not-a-jwt", "a.b.c", "a.b"] {
            assert!(
                matches!(f.issuer.verify_access_token(garbage).unwrap_err(), TokenError::Malformed),
                "{garbage:?} should be malformed"
            );
        }
    }

    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let f = fixture();
        let token = f.issuer.issue_refresh_token(&principal()).await.unwrap();
        assert!(Uuid::parse_str(&token).is_ok());
        assert!(f.issuer.verify_refresh_token(&token).await.unwrap());

        f.issuer.invalidate_refresh_token(&token).await.unwrap();
        assert!(!f.issuer.verify_refresh_token(&token).await.unwrap());
        // Idempotent
        f.issuer.invalidate_refresh_token(&token).await.unwrap();
        assert!(!f.issuer.verify_refresh_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_tokens_are_unique() {
        let f = fixture();
        let p = principal();
        let a = f.issuer.issue_refresh_token(&p).await.unwrap();
        let b = f.issuer.issue_refresh_token(&p).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(f.store.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_refresh_token_removed_on_read() {
        let f = fixture();
        let expired = RefreshToken {
            id: Uuid::new_v4(),
            token: "stale-token".into(),
            user_id: Uuid::new_v4(),
            expires_at: Utc::now() - Duration::seconds(1),
            created_at: Utc::now() - Duration::hours(2),
        };
        f.store.insert(&expired).await.unwrap();
        f.issuer.issue_refresh_token(&principal()).await.unwrap();
        assert_eq!(f.store.len().await, 2);

        assert!(!f.issuer.verify_refresh_token("stale-token").await.unwrap());
        assert_eq!(f.store.len().await, 1);
        assert!(!f.issuer.verify_refresh_token("stale-token").await.unwrap());
        assert_eq!(f.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_rotate_access_token() {
        let f = fixture();
        let user = f.credentials.register("dave", "pw").await.unwrap();
        let refresh = f.issuer.issue_refresh_token(&user.principal()).await.unwrap();

        let access = f.issuer.rotate_access_token(&refresh).await.unwrap();
        let p = f.issuer.verify_access_token(&access).unwrap();
        assert_eq!(p.user_id, user.id);
        assert_eq!(p.username, "dave");

        // Not rotated on use
        assert!(f.issuer.verify_refresh_token(&refresh).await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_with_unknown_token() {
        let f = fixture();
        assert!(matches!(
            f.issuer.rotate_access_token("nope").await.unwrap_err(),
            AuthError::RefreshTokenInvalid
        ));
    }
}
