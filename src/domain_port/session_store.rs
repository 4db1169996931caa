use crate::domain_model::UserId;

/// TTL key-value store tracking the one currently valid refresh token per
/// user, keyed as `refresh_token:{user_id}`.
///
/// The adapter fails OPEN: implementations log store trouble and answer
/// absent / no-op instead of surfacing an error. Callers that need
/// fail-closed semantics (refresh) get them for free, because an
/// unreachable store and a revoked session are indistinguishable here.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Overwrites any previous entry for the user, revoking the refresh
    /// token it held. Last writer wins.
    async fn put(&self, user_id: UserId, refresh_token: &str, ttl_secs: u64);
    /// `None` for absent, expired, or unreachable.
    async fn get(&self, user_id: UserId) -> Option<String>;
    async fn delete(&self, user_id: UserId);
    async fn exists(&self, user_id: UserId) -> bool;
}
