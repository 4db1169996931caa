/// Example demonstrating the credential and session lifecycle end to end
/// against the in-memory backends; no MySQL or Redis needed.
///
/// $ cargo run --bin auth_demo
use gatehouse::application_impl::{
    Argon2PasswordHasher, JwtConfig, JwtHs256Codec, RealAuthService,
};
use gatehouse::application_port::{AuthService, LoginInput, RegisterInput};
use gatehouse::infra_memory::{MemorySessionStore, MemoryUserRepo};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("auth_demo=debug,gatehouse=debug");
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let auth_service = RealAuthService::new(
        Arc::new(MemoryUserRepo::new()),
        Arc::new(Argon2PasswordHasher),
        Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "gatehouse.auth".to_string(),
            audience: "gatehouse-clients".to_string(),
            access_ttl: Duration::from_secs(24 * 60 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            signing_key: b"auth-demo-signing-key".to_vec(),
        })),
        Arc::new(MemorySessionStore::new()),
    );

    let session = auth_service
        .register(RegisterInput {
            email: "alice@example.com".to_string(),
            password: "Passw0rd!".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Doe".to_string(),
            phone: None,
        })
        .await?;
    println!("registered: {}", session.user.email);

    let first_login = auth_service
        .login(LoginInput {
            email: "alice@example.com".to_string(),
            password: "Passw0rd!".to_string(),
        })
        .await?;
    println!("logged in, refresh expires {}", first_login.tokens.refresh_token_expires_at);

    let grant = auth_service
        .refresh(&first_login.tokens.refresh_token.0)
        .await?;
    println!("refreshed, new access expires {}", grant.access_token_expires_at);

    // A second login supersedes the first session entry.
    let second_login = auth_service
        .login(LoginInput {
            email: "alice@example.com".to_string(),
            password: "Passw0rd!".to_string(),
        })
        .await?;
    let stale = auth_service.refresh(&first_login.tokens.refresh_token.0).await;
    println!("stale refresh token denied: {}", stale.is_err());

    auth_service.logout(&second_login.tokens.refresh_token.0).await;
    let after_logout = auth_service.refresh(&second_login.tokens.refresh_token.0).await;
    println!("refresh after logout denied: {}", after_logout.is_err());

    let reset_token = auth_service
        .forgot_password("alice@example.com")
        .await?
        .expect("known email yields a token");
    auth_service.reset_password(&reset_token, "N3wPassw0rd!").await?;
    let relogin = auth_service
        .login(LoginInput {
            email: "alice@example.com".to_string(),
            password: "N3wPassw0rd!".to_string(),
        })
        .await;
    println!("login with reset password: {}", relogin.is_ok());

    Ok(())
}
