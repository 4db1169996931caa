use crate::application_port::{
    AccessGrant, AccessToken, AuthError, AuthService, AuthSession, AuthTokens, LoginInput,
    RefreshToken, RegisterInput,
};
use crate::domain_model::{Role, UserId, UserProfile};
use chrono::{Duration, Utc};

#[derive(Debug)]
pub struct FakeAuthService;

impl FakeAuthService {
    pub fn new() -> Self {
        Self
    }
}

// Minimal fake implementation for basic use only.
// Extend to simulate more error cases and configurable responses when needed.
#[async_trait::async_trait]
impl AuthService for FakeAuthService {
    async fn register(&self, request: RegisterInput) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            user: fake_profile(&request.email),
            tokens: fake_tokens(&request.email),
        })
    }

    async fn login(&self, request: LoginInput) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            user: fake_profile(&request.email),
            tokens: fake_tokens(&request.email),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        if let Some(email) = refresh_token.strip_prefix("fake-refresh-token:") {
            Ok(AccessGrant {
                access_token: AccessToken(format!("fake-access-token:{email}")),
                access_token_expires_at: Utc::now() + Duration::days(1),
            })
        } else {
            Err(AuthError::TokenInvalid)
        }
    }

    async fn logout(&self, _refresh_token: &str) {}

    async fn forgot_password(&self, _email: &str) -> Result<Option<String>, AuthError> {
        Ok(Some("fake-reset-token".to_string()))
    }

    async fn reset_password(&self, _token: &str, _new_password: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        if let Some(email) = access_token.strip_prefix("fake-access-token:") {
            Ok(fake_profile(email))
        } else {
            Err(AuthError::TokenInvalid)
        }
    }
}

fn fake_id(email: &str) -> UserId {
    UserId(uuid::Uuid::new_v5(
        &uuid::Uuid::NAMESPACE_OID,
        email.as_bytes(),
    ))
}

fn fake_profile(email: &str) -> UserProfile {
    UserProfile {
        id: fake_id(email),
        email: email.to_string(),
        first_name: "Fake".to_string(),
        last_name: "User".to_string(),
        phone: None,
        role: Role::Customer,
        is_active: true,
        is_email_verified: false,
        is_phone_verified: false,
        last_login: None,
        created_at: Utc::now(),
    }
}

fn fake_tokens(email: &str) -> AuthTokens {
    let now = Utc::now();
    AuthTokens {
        access_token: AccessToken(format!("fake-access-token:{email}")),
        access_token_expires_at: now + Duration::days(1), // 1 day
        refresh_token: RefreshToken(format!("fake-refresh-token:{email}")),
        refresh_token_expires_at: now + Duration::days(7), // 7 days
    }
}
