use crate::application_port::AuthError;
use crate::domain_model::{UserId, UserRecord};
use crate::domain_port::{NewUser, UserChanges, UserFilter, UserRepo};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local user store for development and tests. Each operation holds
/// the map lock for its whole critical section, which gives it the same
/// single-update atomicity the SQL backend gets from single statements.
pub struct MemoryUserRepo {
    users: Mutex<HashMap<UserId, UserRecord>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<UserId, UserRecord>>, AuthError> {
        self.users
            .lock()
            .map_err(|_| AuthError::Store("user map lock poisoned".to_string()))
    }

    fn matches(record: &UserRecord, filter: &UserFilter) -> bool {
        if let Some(role) = filter.role {
            if record.role != role {
                return false;
            }
        }
        if let Some(active) = filter.is_active {
            if record.is_active != active {
                return false;
            }
        }
        if let Some(term) = &filter.search {
            let term = term.to_lowercase();
            let hit = record.first_name.to_lowercase().contains(&term)
                || record.last_name.to_lowercase().contains(&term)
                || record.email.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        true
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        let mut users = self.users()?;
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            is_active: true,
            is_email_verified: false,
            is_phone_verified: false,
            last_login: None,
            reset_token_digest: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users()?.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users()?.get(&id).cloned())
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, AuthError> {
        Ok(self
            .users()?
            .values()
            .find(|u| {
                u.reset_token_digest.as_deref() == Some(digest)
                    && u.reset_expires_at.is_some_and(|at| at > now)
            })
            .cloned())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), AuthError> {
        if let Some(user) = self.users()?.get_mut(&id) {
            user.last_login = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if let Some(user) = self.users()?.get_mut(&id) {
            user.reset_token_digest = Some(digest.to_string());
            user.reset_expires_at = Some(expires_at);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn replace_password(&self, id: UserId, password_hash: &str) -> Result<(), AuthError> {
        if let Some(user) = self.users()?.get_mut(&id) {
            user.password_hash = password_hash.to_string();
            user.reset_token_digest = None;
            user.reset_expires_at = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, AuthError> {
        let mut users = self.users()?;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(phone) = changes.phone {
            user.phone = Some(phone);
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        if let Some(verified) = changes.is_email_verified {
            user.is_email_verified = verified;
        }
        if let Some(verified) = changes.is_phone_verified {
            user.is_phone_verified = verified;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn set_active(
        &self,
        id: UserId,
        active: bool,
    ) -> Result<Option<UserRecord>, AuthError> {
        let mut users = self.users()?;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.is_active = active;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: UserId) -> Result<bool, AuthError> {
        Ok(self.users()?.remove(&id).is_some())
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, AuthError> {
        Ok(self
            .users()?
            .values()
            .filter(|u| Self::matches(u, filter))
            .count() as u64)
    }

    async fn list(
        &self,
        filter: &UserFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<UserRecord>, AuthError> {
        let mut matched: Vec<UserRecord> = self
            .users()?
            .values()
            .filter(|u| Self::matches(u, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }
}
