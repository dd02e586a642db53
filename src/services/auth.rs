use std::sync::Arc;

use crate::{
    db::StoreError,
    models::user::{JwtResponse, TokenRefreshResponse, User},
    services::{
        credentials::CredentialVerifier,
        metrics::{self, LOGINS_COUNTER, REGISTRATIONS_COUNTER, TOKEN_REFRESH_COUNTER},
        tokens::{TokenError, TokenIssuer},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    CredentialsInvalid,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Invalid refresh token")]
    RefreshTokenInvalid,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// Login, registration, refresh and logout on top of the credential
/// verifier and the token issuer.
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<CredentialVerifier>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(credentials: Arc<CredentialVerifier>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            credentials,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<JwtResponse, AuthError> {
        let result = async {
            let user = self.credentials.verify(username, password).await?;
            self.issue_pair(&user).await
        }
        .await;
        metrics::record_outcome(&LOGINS_COUNTER, &result);
        if let Err(AuthError::CredentialsInvalid) = &result {
            tracing::info!("Login rejected: invalid credentials");
        }
        result
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<JwtResponse, AuthError> {
        let result = async {
            let user = self.credentials.register(username, password).await?;
            tracing::info!(user_id = %user.id, "User registered");
            self.issue_pair(&user).await
        }
        .await;
        metrics::record_outcome(&REGISTRATIONS_COUNTER, &result);
        result
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenRefreshResponse, AuthError> {
        let result = self
            .tokens
            .rotate_access_token(refresh_token)
            .await
            .map(|access_token| TokenRefreshResponse { access_token });
        metrics::record_outcome(&TOKEN_REFRESH_COUNTER, &result);
        result
    }

    /// Idempotent: logging out with an unknown token succeeds.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.tokens.invalidate_refresh_token(refresh_token).await?;
        Ok(())
    }

    async fn issue_pair(&self, user: &User) -> Result<JwtResponse, AuthError> {
        let principal = user.principal();
        let access_token = self.tokens.issue_access_token(&principal)?;
        let refresh_token = self.tokens.issue_refresh_token(&principal).await?;
        Ok(JwtResponse {
            access_token,
            refresh_token,
            user_id: principal.user_id,
            username: principal.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryRefreshTokenStore, InMemoryUserStore};
    use crate::services::tokens::TokenSettings;
    use chrono::Duration;

    fn service() -> AuthService {
        let credentials = Arc::new(CredentialVerifier::new(
            Arc::new(InMemoryUserStore::new()),
            4,
        ));
        let settings = TokenSettings {
            secret: "auth-service-secret".into(),
            access_ttl: Duration::minutes(5),
            refresh_ttl: Duration::hours(1),
        };
        let tokens = Arc::new(TokenIssuer::new(
            &settings,
            Arc::new(InMemoryRefreshTokenStore::new()),
            credentials.clone(),
        ));
        AuthService::new(credentials, tokens)
    }

    #[tokio::test]
    async fn test_login_after_register() {
        let svc = service();
        let registered = svc.register("bob", "correctpw").await.unwrap();

        let res = svc.login("bob", "correctpw").await.unwrap();
        assert_eq!(res.username, "bob");
        assert_eq!(res.user_id, registered.user_id);
        assert!(!res.access_token.is_empty());
        assert!(!res.refresh_token.is_empty());
        // Each session gets its own refresh token
        assert_ne!(res.refresh_token, registered.refresh_token);

        assert!(matches!(
            svc.login("bob", "wrongpw").await.unwrap_err(),
            AuthError::CredentialsInvalid
        ));
    }

    #[tokio::test]
    async fn test_refresh_then_logout() {
        let svc = service();
        let session = svc.register("erin", "pw").await.unwrap();

        let refreshed = svc.refresh(&session.refresh_token).await.unwrap();
        let principal = svc.tokens().verify_access_token(&refreshed.access_token).unwrap();
        assert_eq!(principal.username, "erin");

        svc.logout(&session.refresh_token).await.unwrap();
        assert!(matches!(
            svc.refresh(&session.refresh_token).await.unwrap_err(),
            AuthError::RefreshTokenInvalid
        ));
        svc.logout(&session.refresh_token).await.unwrap();
    }
}
