use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    /// Builds every store client and service exactly once; the resulting
    /// handles live for the whole process and are shared by reference.
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mut pool = None;
        let user_repo: Arc<dyn UserRepo> = match settings.user_store.backend.as_str() {
            "memory" => Arc::new(MemoryUserRepo::new()),
            "mysql" => {
                let dsn = settings.user_store.mysql_dsn.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("user_store.mysql_dsn is required for the mysql backend")
                })?;
                let mysql_pool = Pool::<MySql>::connect(dsn).await?;
                pool = Some(mysql_pool.clone());
                Arc::new(MySqlUserRepo::new(mysql_pool))
            }
            other => return Err(anyhow::anyhow!("Unknown user store backend: {}", other)),
        };

        let session_store: Arc<dyn SessionStore> = match settings.session_store.backend.as_str() {
            "memory" => Arc::new(MemorySessionStore::new()),
            "redis" => {
                let dsn = settings.session_store.redis_dsn.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("session_store.redis_dsn is required for the redis backend")
                })?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.session_store.key_prefix.clone(),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown session store backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| "my-dev-secret-key".to_string())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.jwt.issuer.clone(),
            audience: settings.jwt.audience.clone(),
            access_ttl: Duration::from_secs(settings.jwt.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.jwt.refresh_ttl_secs),
            signing_key: key,
        }));

        let auth_service: Arc<dyn AuthService> = match settings.auth.backend.as_str() {
            "fake" => Arc::new(FakeAuthService::new()),
            "real" => Arc::new(RealAuthService::new(
                user_repo.clone(),
                credential_hasher.clone(),
                token_codec,
                session_store,
            )),
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };

        let user_service: Arc<dyn UserService> =
            Arc::new(RealUserService::new(user_repo, credential_hasher));

        info!("server started");

        Ok(Self {
            auth_service,
            user_service,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
