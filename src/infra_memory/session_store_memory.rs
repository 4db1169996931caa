use crate::domain_model::UserId;
use crate::domain_port::SessionStore;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    refresh_token: String,
    deadline: Instant,
}

/// Process-local session store with the same TTL semantics as the redis
/// backend: an entry past its deadline reads as absent. Honors the
/// fail-open adapter contract, so even a poisoned lock degrades to absent.
pub struct MemorySessionStore {
    entries: Mutex<HashMap<UserId, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, user_id: UserId, refresh_token: &str, ttl_secs: u64) {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!(%user_id, "session map lock poisoned, dropping put");
            return;
        };
        entries.insert(
            user_id,
            Entry {
                refresh_token: refresh_token.to_string(),
                deadline: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
    }

    async fn get(&self, user_id: UserId) -> Option<String> {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!(%user_id, "session map lock poisoned, reading as absent");
            return None;
        };
        match entries.get(&user_id) {
            Some(entry) if entry.deadline > Instant::now() => Some(entry.refresh_token.clone()),
            Some(_) => {
                entries.remove(&user_id);
                None
            }
            None => None,
        }
    }

    async fn delete(&self, user_id: UserId) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&user_id);
        }
    }

    async fn exists(&self, user_id: UserId) -> bool {
        self.get(user_id).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_id() -> UserId {
        UserId(uuid::Uuid::new_v4())
    }

    #[tokio::test]
    async fn put_overwrites_previous_entry() {
        let store = MemorySessionStore::new();
        let uid = user_id();

        store.put(uid, "token-1", 60).await;
        store.put(uid, "token-2", 60).await;

        assert_eq!(store.get(uid).await.as_deref(), Some("token-2"));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let store = MemorySessionStore::new();
        let uid = user_id();

        store.put(uid, "token", 0).await;
        assert_eq!(store.get(uid).await, None);
        assert!(!store.exists(uid).await);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemorySessionStore::new();
        let uid = user_id();

        store.put(uid, "token", 60).await;
        store.delete(uid).await;
        store.delete(uid).await;

        assert_eq!(store.get(uid).await, None);
    }
}
