use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::error::ConversationError;
use crate::models::ConversationState;

/// Short-lived chat state keyed by conversation id. Entries expire after
/// the store's TTL; scheduling never depends on them.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Result<Option<ConversationState>, ConversationError>;
    async fn put(&self, state: &ConversationState) -> Result<(), ConversationError>;
    async fn delete(&self, conversation_id: &str) -> Result<(), ConversationError>;
}

/// Redis when configured and reachable, otherwise process-local memory.
pub async fn conversation_store_from_config(config: &AppConfig) -> Arc<dyn ConversationStore> {
    let ttl = Duration::from_secs(config.conversation_ttl_seconds);

    if let Some(url) = &config.redis_url {
        match RedisConversationStore::connect(url, ttl).await {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("Redis unavailable ({}), keeping conversations in memory", e),
        }
    }

    let store = Arc::new(InMemoryConversationStore::new(ttl));
    store.spawn_purge_task(ttl);
    store
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

struct Entry {
    state: ConversationState,
    expires_at: Instant,
}

pub struct InMemoryConversationStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl InMemoryConversationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Drops expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);

        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired conversations", purged);
        }
        purged
    }

    pub fn spawn_purge_task(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                store.purge_expired().await;
            }
        })
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<ConversationState>, ConversationError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(conversation_id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.state.clone()))
    }

    async fn put(&self, state: &ConversationState) -> Result<(), ConversationError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            state.conversation_id.clone(),
            Entry {
                state: state.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), ConversationError> {
        self.entries.write().await.remove(conversation_id);
        Ok(())
    }
}

// ==============================================================================
// REDIS STORE
// ==============================================================================

pub struct RedisConversationStore {
    pool: Pool,
    ttl: Duration,
}

impl RedisConversationStore {
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, ConversationError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            ConversationError::StoreError(format!("Failed to create Redis pool: {}", e))
        })?;

        let store = Self { pool, ttl };
        let mut conn = store.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("Redis conversation store initialized");
        Ok(store)
    }

    async fn get_connection(&self) -> Result<Connection, ConversationError> {
        self.pool.get().await.map_err(|e| {
            ConversationError::StoreError(format!("Failed to get Redis connection: {}", e))
        })
    }
}

pub fn conversation_key(conversation_id: &str) -> String {
    format!("conversation:{}", conversation_id)
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<ConversationState>, ConversationError> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(conversation_key(conversation_id))
            .query_async(&mut conn)
            .await?;

        raw.map(|value| serde_json::from_str(&value))
            .transpose()
            .map_err(ConversationError::from)
    }

    async fn put(&self, state: &ConversationState) -> Result<(), ConversationError> {
        let mut conn = self.get_connection().await?;
        let value = serde_json::to_string(state)?;

        let _: () = redis::cmd("SET")
            .arg(conversation_key(&state.conversation_id))
            .arg(value)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), ConversationError> {
        let mut conn = self.get_connection().await?;
        let _: () = redis::cmd("DEL")
            .arg(conversation_key(conversation_id))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
