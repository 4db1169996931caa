use crate::application_port::AuthError;
use crate::domain_model::{Role, UserId, UserRecord};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring match over first name, last name and email.
    pub search: Option<String>,
}

/// Field-level patch applied as one atomic update. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_email_verified: Option<bool>,
    pub is_phone_verified: Option<bool>,
}

/// User record store. Every mutation is a single atomic update against one
/// record; callers never read-modify-write a security-sensitive field across
/// two calls.
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with [`AuthError::EmailTaken`] when the email is already present,
    /// including when a concurrent create won the race.
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError>;
    /// Exact, case-sensitive email match.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, AuthError>;
    /// Reset-token digest match with an unexpired deadline.
    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, AuthError>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), AuthError>;
    async fn set_reset_token(
        &self,
        id: UserId,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;
    /// Replaces the password hash and clears both reset fields in one update.
    async fn replace_password(&self, id: UserId, password_hash: &str) -> Result<(), AuthError>;

    async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, AuthError>;
    async fn set_active(&self, id: UserId, active: bool)
    -> Result<Option<UserRecord>, AuthError>;
    /// Returns whether a record was actually removed.
    async fn delete(&self, id: UserId) -> Result<bool, AuthError>;

    async fn count(&self, filter: &UserFilter) -> Result<u64, AuthError>;
    /// Newest-first page of records.
    async fn list(
        &self,
        filter: &UserFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<UserRecord>, AuthError>;
}
