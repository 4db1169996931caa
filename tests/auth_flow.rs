//! End-to-end exercises of the credential and session lifecycle against the
//! in-memory backends: register, login, refresh, logout, password reset, and
//! the uniform-failure guarantees around each of them.

use chrono::{Duration as ChronoDuration, Utc};
use gatehouse::application_impl::{
    Argon2PasswordHasher, JwtConfig, JwtHs256Codec, RealAuthService,
};
use gatehouse::application_port::{
    AuthError, AuthService, AuthSession, LoginInput, RegisterInput,
};
use gatehouse::domain_port::UserRepo;
use gatehouse::infra_memory::{MemorySessionStore, MemoryUserRepo};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    auth: RealAuthService,
    users: Arc<MemoryUserRepo>,
}

fn harness() -> Harness {
    let users = Arc::new(MemoryUserRepo::new());
    let auth = RealAuthService::new(
        users.clone(),
        Arc::new(Argon2PasswordHasher),
        Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "gatehouse.auth".to_string(),
            audience: "gatehouse-clients".to_string(),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(7200),
            signing_key: b"integration-test-signing-key".to_vec(),
        })),
        Arc::new(MemorySessionStore::new()),
    );
    Harness { auth, users }
}

const ALICE: &str = "alice@example.com";
const PASSWORD: &str = "Passw0rd!";

async fn register_alice(auth: &RealAuthService) -> AuthSession {
    auth.register(RegisterInput {
        email: ALICE.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Alice".to_string(),
        last_name: "Doe".to_string(),
        phone: None,
    })
    .await
    .expect("registration succeeds")
}

async fn login_alice(auth: &RealAuthService) -> AuthSession {
    auth.login(LoginInput {
        email: ALICE.to_string(),
        password: PASSWORD.to_string(),
    })
    .await
    .expect("login succeeds")
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let h = harness();
    let registered = register_alice(&h.auth).await;
    assert_eq!(registered.user.email, ALICE);
    assert!(!registered.tokens.access_token.0.is_empty());
    assert!(!registered.tokens.refresh_token.0.is_empty());

    // Nothing password-shaped may appear in the serialized payload.
    let body = serde_json::json!({
        "user": registered.user,
        "accessToken": registered.tokens.access_token,
        "refreshToken": registered.tokens.refresh_token,
    });
    assert!(!body.to_string().to_lowercase().contains("password"));

    let session = login_alice(&h.auth).await;
    assert_eq!(session.user.email, ALICE);
    assert!(session.user.last_login.is_some());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let h = harness();
    register_alice(&h.auth).await;

    let err = h
        .auth
        .register(RegisterInput {
            email: ALICE.to_string(),
            password: "An0therPass!".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Again".to_string(),
            phone: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailTaken));
}

#[tokio::test]
async fn short_password_is_rejected() {
    let h = harness();
    let err = h
        .auth
        .register(RegisterInput {
            email: ALICE.to_string(),
            password: "short".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Doe".to_string(),
            phone: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let h = harness();
    let session = register_alice(&h.auth).await;

    let unknown_email = h
        .auth
        .login(LoginInput {
            email: "nobody@example.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();

    let wrong_password = h
        .auth
        .login(LoginInput {
            email: ALICE.to_string(),
            password: "WrongPass1!".to_string(),
        })
        .await
        .unwrap_err();

    h.users.set_active(session.user.id, false).await.unwrap();
    let deactivated = h
        .auth
        .login(LoginInput {
            email: ALICE.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();

    for err in [&unknown_email, &wrong_password, &deactivated] {
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
    assert_eq!(unknown_email.to_string(), wrong_password.to_string());
    assert_eq!(wrong_password.to_string(), deactivated.to_string());
}

#[tokio::test]
async fn refresh_issues_a_working_access_token() {
    let h = harness();
    let session = register_alice(&h.auth).await;

    let grant = h
        .auth
        .refresh(&session.tokens.refresh_token.0)
        .await
        .expect("registered session refreshes");

    let profile = h
        .auth
        .authenticate(&grant.access_token.0)
        .await
        .expect("fresh access token authenticates");
    assert_eq!(profile.email, ALICE);

    // The refresh token is not rotated by a refresh; it keeps working.
    h.auth
        .refresh(&session.tokens.refresh_token.0)
        .await
        .expect("refresh token is reusable until superseded");
}

#[tokio::test]
async fn second_login_revokes_the_first_refresh_token() {
    let h = harness();
    register_alice(&h.auth).await;

    let first = login_alice(&h.auth).await;
    let second = login_alice(&h.auth).await;

    let err = h
        .auth
        .refresh(&first.tokens.refresh_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));

    h.auth
        .refresh(&second.tokens.refresh_token.0)
        .await
        .expect("newest session stays valid");
}

#[tokio::test]
async fn logout_is_idempotent_and_blocks_refresh() {
    let h = harness();
    let session = register_alice(&h.auth).await;
    let refresh_token = session.tokens.refresh_token.0;

    h.auth.logout(&refresh_token).await;
    h.auth.logout(&refresh_token).await; // second call is a quiet no-op
    h.auth.logout("not-even-a-jwt").await; // as is garbage input

    let err = h.auth.refresh(&refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}

#[tokio::test]
async fn token_kinds_are_not_interchangeable() {
    let h = harness();
    let session = register_alice(&h.auth).await;

    let err = h
        .auth
        .refresh(&session.tokens.access_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));

    let err = h
        .auth
        .authenticate(&session.tokens.refresh_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}

#[tokio::test]
async fn refresh_is_denied_once_the_user_is_deactivated() {
    let h = harness();
    let session = register_alice(&h.auth).await;

    h.users.set_active(session.user.id, false).await.unwrap();

    let err = h
        .auth
        .refresh(&session.tokens.refresh_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));

    let err = h
        .auth
        .authenticate(&session.tokens.access_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}

#[tokio::test]
async fn refresh_is_denied_once_the_user_is_deleted() {
    let h = harness();
    let session = register_alice(&h.auth).await;

    h.users.delete(session.user.id).await.unwrap();

    let err = h
        .auth
        .refresh(&session.tokens.refresh_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}

#[tokio::test]
async fn forgot_password_is_quiet_about_unknown_emails() {
    let h = harness();
    register_alice(&h.auth).await;

    let known = h.auth.forgot_password(ALICE).await.unwrap();
    assert!(known.is_some());

    let unknown = h.auth.forgot_password("nobody@example.com").await.unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn reset_password_replaces_the_credential_once() {
    let h = harness();
    register_alice(&h.auth).await;

    let token = h.auth.forgot_password(ALICE).await.unwrap().unwrap();
    h.auth
        .reset_password(&token, "N3wPassw0rd!")
        .await
        .expect("fresh token resets");

    let err = h
        .auth
        .login(LoginInput {
            email: ALICE.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    h.auth
        .login(LoginInput {
            email: ALICE.to_string(),
            password: "N3wPassw0rd!".to_string(),
        })
        .await
        .expect("new password logs in");

    // Spent tokens are gone with the reset fields.
    let err = h
        .auth
        .reset_password(&token, "Y3tAnother!")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ResetTokenInvalid));
}

#[tokio::test]
async fn expired_reset_token_changes_nothing() {
    let h = harness();
    let session = register_alice(&h.auth).await;

    let token = "expired-reset-token";
    let digest = hex::encode(Sha256::digest(token.as_bytes()));
    h.users
        .set_reset_token(
            session.user.id,
            &digest,
            Utc::now() - ChronoDuration::minutes(5),
        )
        .await
        .unwrap();

    let err = h
        .auth
        .reset_password(token, "N3wPassw0rd!")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ResetTokenInvalid));

    login_alice(&h.auth).await; // the old password still works
}

#[tokio::test]
async fn authenticate_rejects_garbage_and_unknown_users() {
    let h = harness();
    let session = register_alice(&h.auth).await;

    assert!(h.auth.authenticate("not-a-jwt").await.is_err());

    h.users.delete(session.user.id).await.unwrap();
    let err = h
        .auth
        .authenticate(&session.tokens.access_token.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
}
