use crate::domain_model::{Role, UserId, UserProfile};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user with this email already exists")]
    EmailTaken,
    #[error("password does not meet the minimum length")]
    WeakPassword,
    #[error("user not found")]
    UserNotFound,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid or expired reset token")]
    ResetTokenInvalid,
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Result of register/login: the sanitized user plus a fresh token pair.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserProfile,
    pub tokens: AuthTokens,
}

/// Result of a refresh: a new access token only. The refresh token is not
/// rotated; it stays valid until its own expiry or the next login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub access_token: AccessToken,
    pub access_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AccessTokenData {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct RefreshTokenData {
    pub user_id: UserId,
    pub jti: String,
}

/// Signs and verifies the two token kinds. Verification enforces the claim
/// shape, so a refresh token can never pass an access-token check or the
/// other way around, even though both are signed with the same key.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    async fn issue_refresh_token(
        &self,
        user_id: UserId,
        jti: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;
    async fn verify_access_token(&self, token: &AccessToken)
    -> Result<AccessTokenData, AuthError>;
    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenData, AuthError>;
    /// Signature and issuer/audience are still checked; only the expiry is
    /// skipped. Used by logout, which must revoke expired tokens too.
    async fn decode_refresh_ignoring_expiry(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenData, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    /// Returns `Ok(false)` for a mismatch and for a malformed stored hash;
    /// the caller cannot tell the two apart.
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<AuthSession, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<AuthSession, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError>;
    /// Idempotent; never fails. A malformed token or an already-absent
    /// session entry both count as logged out.
    async fn logout(&self, refresh_token: &str);
    /// Returns the raw reset token when the email matched a user, `None`
    /// otherwise. The transport layer must answer identically in both cases.
    async fn forgot_password(&self, email: &str) -> Result<Option<String>, AuthError>;
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError>;
    /// Verifies a bearer access token and loads the user behind it.
    /// A missing or deactivated user fails the same way an invalid token does.
    async fn authenticate(&self, access_token: &str) -> Result<UserProfile, AuthError>;
}
