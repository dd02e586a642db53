use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{StoreError, UserStore},
    models::{auth::Principal, user::User},
    services::auth::AuthError,
};

/// Checks username/password pairs against the stored bcrypt hashes.
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
    cost: u32,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserStore>, cost: u32) -> Self {
        Self { users, cost }
    }

    pub fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }

    /// Returns the user when the password matches. Unknown usernames and wrong
    /// passwords fail identically.
    pub async fn verify(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::CredentialsInvalid)?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| AuthError::CredentialsInvalid)?;
        if !valid {
            return Err(AuthError::CredentialsInvalid);
        }
        Ok(user)
    }

    /// Hashes the password and creates the user.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        let hash = self.hash_password(password)?;
        match self.users.create(username, &hash).await {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent registration of the same name.
            Err(StoreError::Duplicate(_)) => Err(AuthError::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_principal(&self, user_id: Uuid) -> Result<Option<Principal>, AuthError> {
        Ok(self
            .users
            .find_by_id(user_id)
            .await?
            .map(|u| u.principal()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryUserStore;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(Arc::new(InMemoryUserStore::new()), 4)
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let v = verifier();
        let user = v.register("bob", "correctpw").await.unwrap();
        assert_ne!(user.password_hash, "correctpw");

        let found = v.verify("bob", "correctpw").await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let v = verifier();
        v.register("bob", "correctpw").await.unwrap();

        assert!(matches!(
            v.verify("bob", "wrongpw").await.unwrap_err(),
            AuthError::CredentialsInvalid
        ));
        assert!(matches!(
            v.verify("nobody", "correctpw").await.unwrap_err(),
            AuthError::CredentialsInvalid
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let v = verifier();
        v.register("bob", "pw1").await.unwrap();
        assert!(matches!(
            v.register("bob", "pw2").await.unwrap_err(),
            AuthError::UsernameTaken
        ));
    }

    #[tokio::test]
    async fn test_find_principal() {
        let v = verifier();
        let user = v.register("carol", "pw").await.unwrap();
        let principal = v.find_principal(user.id).await.unwrap().unwrap();
        assert_eq!(principal.username, "carol");
        assert!(v.find_principal(Uuid::new_v4()).await.unwrap().is_none());
    }
}
