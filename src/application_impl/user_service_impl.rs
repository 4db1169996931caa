use crate::application_port::{
    AdminUserChanges, AuthError, CredentialHasher, Pagination, ProfileChanges, UserPage,
    UserQuery, UserService,
};
use crate::domain_model::{UserId, UserProfile};
use crate::domain_port::{UserChanges, UserFilter, UserRepo};
use std::sync::Arc;
use tracing::info;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;
const MIN_PASSWORD_LEN: usize = 8;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>, credential_hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            user_repo,
            credential_hasher,
        }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn update_profile(
        &self,
        user_id: UserId,
        changes: ProfileChanges,
    ) -> Result<UserProfile, AuthError> {
        let updated = self
            .user_repo
            .update(
                user_id,
                UserChanges {
                    first_name: changes.first_name,
                    last_name: changes.last_name,
                    phone: changes.phone,
                    ..UserChanges::default()
                },
            )
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(email = %updated.email, "user profile updated");
        Ok(UserProfile::from(updated))
    }

    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(current_password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::WrongPassword);
        }

        let password_hash = self.credential_hasher.hash_password(new_password).await?;
        self.user_repo
            .replace_password(user.id, &password_hash)
            .await?;

        info!(email = %user.email, "password changed");
        Ok(())
    }

    async fn list_users(&self, query: UserQuery) -> Result<UserPage, AuthError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let skip = (page - 1) * limit;

        let filter = UserFilter {
            role: query.role,
            is_active: query.is_active,
            search: query.search,
        };

        let total = self.user_repo.count(&filter).await?;
        let users = self.user_repo.list(&filter, skip, limit).await?;
        let fetched = users.len() as u64;

        Ok(UserPage {
            users: users.into_iter().map(UserProfile::from).collect(),
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit),
                has_next: skip + fetched < total,
                has_prev: page > 1,
            },
        })
    }

    async fn get_user(&self, id: UserId) -> Result<UserProfile, AuthError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthError::UserNotFound)
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: AdminUserChanges,
    ) -> Result<UserProfile, AuthError> {
        let updated = self
            .user_repo
            .update(
                id,
                UserChanges {
                    first_name: changes.first_name,
                    last_name: changes.last_name,
                    phone: changes.phone,
                    role: changes.role,
                    is_active: changes.is_active,
                    is_email_verified: changes.is_email_verified,
                    is_phone_verified: changes.is_phone_verified,
                },
            )
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(email = %updated.email, "user updated by admin");
        Ok(UserProfile::from(updated))
    }

    async fn delete_user(&self, id: UserId) -> Result<(), AuthError> {
        if !self.user_repo.delete(id).await? {
            return Err(AuthError::UserNotFound);
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn set_user_active(&self, id: UserId, active: bool) -> Result<UserProfile, AuthError> {
        let updated = self
            .user_repo
            .set_active(id, active)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(email = %updated.email, active, "user activation changed");
        Ok(UserProfile::from(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::Argon2PasswordHasher;
    use crate::domain_model::Role;
    use crate::domain_port::NewUser;
    use crate::infra_memory::MemoryUserRepo;

    async fn seed(repo: &MemoryUserRepo, email: &str, role: Role) -> UserId {
        let id = UserId(uuid::Uuid::new_v4());
        repo.create(NewUser {
            id,
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$c29tZWhhc2g".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: None,
            role,
        })
        .await
        .unwrap();
        id
    }

    fn service(repo: Arc<MemoryUserRepo>) -> RealUserService {
        RealUserService::new(repo, Arc::new(Argon2PasswordHasher))
    }

    #[tokio::test]
    async fn list_users_paginates_newest_first() {
        let repo = Arc::new(MemoryUserRepo::new());
        for i in 0..25 {
            seed(&repo, &format!("user{i}@example.com"), Role::Customer).await;
        }
        let service = service(repo);

        let page = service
            .list_users(UserQuery {
                page: Some(2),
                limit: Some(10),
                ..UserQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.users.len(), 10);
        assert_eq!(page.pagination.total, 25);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[tokio::test]
    async fn list_users_filters_by_role_and_search() {
        let repo = Arc::new(MemoryUserRepo::new());
        seed(&repo, "alice@example.com", Role::Admin).await;
        seed(&repo, "bob@example.com", Role::Customer).await;
        let service = service(repo);

        let admins = service
            .list_users(UserQuery {
                role: Some(Role::Admin),
                ..UserQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.users.len(), 1);
        assert_eq!(admins.users[0].email, "alice@example.com");

        let found = service
            .list_users(UserQuery {
                search: Some("ALICE".to_string()),
                ..UserQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(found.users.len(), 1);
    }

    #[tokio::test]
    async fn admin_lifecycle_on_missing_user_is_not_found() {
        let service = service(Arc::new(MemoryUserRepo::new()));
        let ghost = UserId(uuid::Uuid::new_v4());

        assert!(matches!(
            service.get_user(ghost).await.unwrap_err(),
            AuthError::UserNotFound
        ));
        assert!(matches!(
            service.delete_user(ghost).await.unwrap_err(),
            AuthError::UserNotFound
        ));
        assert!(matches!(
            service.set_user_active(ghost, false).await.unwrap_err(),
            AuthError::UserNotFound
        ));
    }

    #[tokio::test]
    async fn deactivate_then_activate_flips_flag() {
        let repo = Arc::new(MemoryUserRepo::new());
        let id = seed(&repo, "carol@example.com", Role::Customer).await;
        let service = service(repo);

        let off = service.set_user_active(id, false).await.unwrap();
        assert!(!off.is_active);
        let on = service.set_user_active(id, true).await.unwrap();
        assert!(on.is_active);
    }
}
