use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{normalize_contact, User},
    error::{AppError, Result},
    repository::UserRepository,
};

pub mod session;

use session::{Session, SessionStore};

pub const SESSION_COOKIE: &str = "session";

pub struct AuthService {
    session_store: SessionStore,
    user_repo: Arc<dyn UserRepository>,
    session_duration_hours: i64,
}

impl AuthService {
    pub fn new(pool: SqlitePool, user_repo: Arc<dyn UserRepository>, session_duration_hours: i64) -> Self {
        Self {
            session_store: SessionStore::new(pool),
            user_repo,
            session_duration_hours,
        }
    }

    pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        let argon2 = Argon2::default();

        Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    pub async fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Checks an email-or-phone plus password pair.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<User> {
        let identifier = normalize_contact(identifier);
        let user = self
            .user_repo
            .find_by_identifier(&identifier)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let hash = self
            .user_repo
            .password_hash_for(user.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !Self::verify_password(password, &hash).await? {
            tracing::warn!("Failed login for {}", identifier);
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    pub async fn create_session(&self, user_id: Uuid) -> Result<(Session, String)> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(self.session_duration_hours);

        let session = self.session_store
            .create(user_id, &token, expires_at)
            .await?;

        Ok((session, token))
    }

    /// Resolves a session token to its user, if the session is still live.
    pub async fn user_for_token(&self, token: &str) -> Result<Option<User>> {
        match self.session_store.find_by_token(token).await? {
            Some(session) => self.user_repo.find_by_id(session.user_id).await,
            None => Ok(None),
        }
    }

    pub async fn invalidate_session(&self, token: &str) -> Result<()> {
        self.session_store.delete_by_token(token).await
    }

    pub fn create_session_cookie(&self, token: &str, secure: bool) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(secure)
            .max_age(cookie::time::Duration::hours(self.session_duration_hours))
            .build()
    }

    pub fn create_logout_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(0))
            .build()
    }
}

fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hash = AuthService::hash_password("Donor1234!").await.unwrap();
        assert!(AuthService::verify_password("Donor1234!", &hash).await.unwrap());
        assert!(!AuthService::verify_password("wrong", &hash).await.unwrap());
    }

    #[test]
    fn test_tokens_are_random_hex() {
        let a = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, generate_token());
    }
}
