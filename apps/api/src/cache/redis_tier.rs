use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::cache::FastTier;

/// Fast tier backed by Redis. `ConnectionManager` reconnects on its own and is
/// cheap to clone per command.
#[derive(Clone)]
pub struct RedisTier {
    conn: ConnectionManager,
}

impl RedisTier {
    pub async fn connect(client: redis::Client) -> Result<Self> {
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to open Redis connection manager")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl FastTier for RedisTier {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        if ttl_secs > 0 {
            conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        } else {
            conn.set::<_, _, ()>(key, value).await?;
        }
        Ok(())
    }
}
