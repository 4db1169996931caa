use crate::application_port::{
    AccessGrant, AccessToken, AuthError, AuthService, AuthSession, AuthTokens, CredentialHasher,
    LoginInput, RefreshToken, RegisterInput, TokenCodec,
};
use crate::domain_model::{Role, UserId, UserProfile, UserRecord};
use crate::domain_port::{NewUser, SessionStore, UserRepo};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        // A record with a malformed hash must fail like a wrong password,
        // not like a server fault.
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            warn!("stored password hash is not a valid PHC string");
            return Ok(false);
        };

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

const RESET_TOKEN_LEN: usize = 64;

fn reset_token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    min_password_len: usize,
    reset_token_ttl: Duration,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            session_store,
            min_password_len: 8,
            reset_token_ttl: Duration::from_secs(60 * 60),
        }
    }

    fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.min_password_len {
            return Err(AuthError::WeakPassword);
        }
        Ok(())
    }

    #[inline]
    fn new_jti() -> String {
        Uuid::new_v4().to_string()
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let secs = (until - Utc::now()).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    /// Mints a fresh token pair and registers the refresh token as the one
    /// valid session entry for the user, revoking any predecessor.
    async fn open_session(&self, user: &UserRecord) -> Result<AuthTokens, AuthError> {
        let (access_token, access_exp) = self
            .token_codec
            .issue_access_token(user.id, &user.email, user.role)
            .await?;
        let (refresh_token, refresh_exp) = self
            .token_codec
            .issue_refresh_token(user.id, &Self::new_jti())
            .await?;

        self.session_store
            .put(user.id, &refresh_token.0, Self::ttl_secs(refresh_exp))
            .await;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<AuthSession, AuthError> {
        self.validate_password(&request.password)?;

        // Early duplicate check for a friendly error; the store's unique key
        // still backstops a concurrent create.
        if self.user_repo.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self
            .credential_hasher
            .hash_password(&request.password)
            .await?;
        let user = self
            .user_repo
            .create(NewUser {
                id: UserId(Uuid::new_v4()),
                email: request.email,
                password_hash,
                first_name: request.first_name,
                last_name: request.last_name,
                phone: request.phone,
                role: Role::Customer,
            })
            .await?;

        let tokens = self.open_session(&user).await?;
        info!(email = %user.email, "user registered");

        Ok(AuthSession {
            user: UserProfile::from(user),
            tokens,
        })
    }

    async fn login(&self, request: LoginInput) -> Result<AuthSession, AuthError> {
        // Absent user, deactivated user and wrong password must be
        // indistinguishable to the caller.
        let Some(user) = self.user_repo.find_by_email(&request.email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }
        let ok = self
            .credential_hasher
            .verify_password(&request.password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        self.user_repo.record_login(user.id, now).await?;

        let tokens = self.open_session(&user).await?;
        info!(email = %user.email, "user logged in");

        let mut user = UserProfile::from(user);
        user.last_login = Some(now);
        Ok(AuthSession { user, tokens })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        let data = self
            .token_codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_string()))
            .await?;

        // Fail closed: absent covers never-issued, logged-out, superseded by
        // a newer login, and store-unreachable alike.
        match self.session_store.get(data.user_id).await {
            Some(stored) if stored == refresh_token => {}
            _ => return Err(AuthError::TokenInvalid),
        }

        let user = self
            .user_repo
            .find_by_id(data.user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !user.is_active {
            return Err(AuthError::TokenInvalid);
        }

        let (access_token, access_exp) = self
            .token_codec
            .issue_access_token(user.id, &user.email, user.role)
            .await?;

        Ok(AccessGrant {
            access_token,
            access_token_expires_at: access_exp,
        })
    }

    async fn logout(&self, refresh_token: &str) {
        // Expired tokens still name a session entry worth deleting; anything
        // that fails signature or shape checks simply has nothing to revoke.
        if let Ok(data) = self
            .token_codec
            .decode_refresh_ignoring_expiry(&RefreshToken(refresh_token.to_string()))
            .await
        {
            self.session_store.delete(data.user_id).await;
            info!(user_id = %data.user_id, "user logged out");
        }
    }

    async fn forgot_password(&self, email: &str) -> Result<Option<String>, AuthError> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            return Ok(None);
        };

        let token = nanoid!(RESET_TOKEN_LEN);
        let expires_at = Utc::now() + self.reset_token_ttl;
        self.user_repo
            .set_reset_token(user.id, &reset_token_digest(&token), expires_at)
            .await?;

        info!(email = %user.email, "password reset token generated");
        Ok(Some(token))
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        self.validate_password(new_password)?;

        let user = self
            .user_repo
            .find_by_reset_digest(&reset_token_digest(token), Utc::now())
            .await?
            .ok_or(AuthError::ResetTokenInvalid)?;

        let password_hash = self.credential_hasher.hash_password(new_password).await?;
        // One update: new hash in, both reset fields out. A reset token can
        // never be replayed after it has been spent.
        self.user_repo
            .replace_password(user.id, &password_hash)
            .await?;

        info!(email = %user.email, "password reset");
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let data = self
            .token_codec
            .verify_access_token(&AccessToken(access_token.to_string()))
            .await?;

        // A vanished or deactivated user fails exactly like a bad token.
        let user = self
            .user_repo
            .find_by_id(data.user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !user.is_active {
            return Err(AuthError::TokenInvalid);
        }

        Ok(UserProfile::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_round_trip() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash_password("Passw0rd!").await.unwrap();
        assert!(hasher.verify_password("Passw0rd!", &hash).await.unwrap());
        assert!(!hasher.verify_password("passw0rd!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_fails_like_wrong_password() {
        let hasher = Argon2PasswordHasher;
        assert!(
            !hasher
                .verify_password("Passw0rd!", "not-a-phc-string")
                .await
                .unwrap()
        );
    }

    #[test]
    fn reset_token_digest_is_stable_hex() {
        let a = reset_token_digest("some-token");
        let b = reset_token_digest("some-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, reset_token_digest("other-token"));
    }
}
