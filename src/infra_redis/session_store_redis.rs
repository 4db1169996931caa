use crate::domain_model::UserId;
use crate::domain_port::SessionStore;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::warn;

/// Redis-backed session store. Keys look like `refresh_token:{user_id}` and
/// expire with the refresh-token TTL; a lost entry only ever means a denied
/// refresh, so every error path degrades to absent instead of failing the
/// request.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, user_id: UserId) -> String {
        format!("{}:{}", self.prefix, user_id)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, user_id: UserId, refresh_token: &str, ttl_secs: u64) {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn.set_ex(&key, refresh_token, ttl_secs).await;
        if let Err(e) = result {
            warn!(%user_id, error = %e, "session store put failed");
        }
    }

    async fn get(&self, user_id: UserId) -> Option<String> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<Option<String>> = conn.get(&key).await;
        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(%user_id, error = %e, "session store get failed");
                None
            }
        }
    }

    async fn delete(&self, user_id: UserId) {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn.del(&key).await;
        if let Err(e) = result {
            warn!(%user_id, error = %e, "session store delete failed");
        }
    }

    async fn exists(&self, user_id: UserId) -> bool {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<bool> = conn.exists(&key).await;
        match result {
            Ok(present) => present,
            Err(e) => {
                warn!(%user_id, error = %e, "session store exists failed");
                false
            }
        }
    }
}
