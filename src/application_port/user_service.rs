use crate::application_port::AuthError;
use crate::domain_model::{Role, UserId, UserProfile};
use serde::Serialize;

/// Self-service profile changes. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Admin-side changes; a superset of [`ProfileChanges`].
#[derive(Debug, Clone, Default)]
pub struct AdminUserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_email_verified: Option<bool>,
    pub is_phone_verified: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub pagination: Pagination,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn update_profile(
        &self,
        user_id: UserId,
        changes: ProfileChanges,
    ) -> Result<UserProfile, AuthError>;
    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    // Admin operations. Callers are expected to have passed the role guard.
    async fn list_users(&self, query: UserQuery) -> Result<UserPage, AuthError>;
    async fn get_user(&self, id: UserId) -> Result<UserProfile, AuthError>;
    async fn update_user(
        &self,
        id: UserId,
        changes: AdminUserChanges,
    ) -> Result<UserProfile, AuthError>;
    async fn delete_user(&self, id: UserId) -> Result<(), AuthError>;
    async fn set_user_active(&self, id: UserId, active: bool) -> Result<UserProfile, AuthError>;
}
