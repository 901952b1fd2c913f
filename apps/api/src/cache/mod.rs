//! Two cache tiers behind one `get` / `put` interface.
//!
//! Lookup order is fixed: fast tier → durable tier → caller goes to the model.
//! Every tier call runs inside its own error boundary: failures and timeouts are
//! logged at `warn` and read as a miss (`get`) or a no-op (`put`). Nothing in
//! here can fail a scoring request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod key;
pub mod redis_tier;
pub mod s3_tier;

pub use key::hash_key;

/// Embeddings for identical text never change, so entries live for 30 days.
pub const DEFAULT_TTL_SECS: u64 = 2_592_000;

/// Volatile key/value tier (Redis). Values are JSON-encoded vectors.
#[async_trait]
pub trait FastTier: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()>;
}

/// Durable record tier. Records carry their own expiry.
#[async_trait]
pub trait DurableTier: Send + Sync {
    async fn get_item(&self, table: &str, id: &str) -> anyhow::Result<Option<DurableRecord>>;
    async fn put_item(&self, table: &str, record: &DurableRecord) -> anyhow::Result<()>;
}

/// One cached embedding as persisted in the durable tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableRecord {
    pub id: String,
    /// JSON-encoded vector.
    pub embedding: String,
    /// Unix seconds.
    pub expires_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

impl DurableRecord {
    pub fn new(
        id: &str,
        vector: &[f32],
        ttl_secs: u64,
        now_millis: i64,
    ) -> serde_json::Result<Self> {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Ok(Self {
            id: id.to_string(),
            embedding: serde_json::to_string(vector)?,
            expires_at: (now_millis / 1000).saturating_add(ttl),
            updated_at: now_millis,
        })
    }

    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.expires_at <= now_secs
    }

    /// Seconds left before expiry, zero once expired.
    pub fn remaining_secs(&self, now_secs: i64) -> u64 {
        u64::try_from(self.expires_at.saturating_sub(now_secs)).unwrap_or(0)
    }
}

pub struct EmbeddingCache {
    fast: Arc<dyn FastTier>,
    durable: Arc<dyn DurableTier>,
    table: String,
    ttl_secs: u64,
    op_timeout: Duration,
}

impl EmbeddingCache {
    pub fn new(
        fast: Arc<dyn FastTier>,
        durable: Arc<dyn DurableTier>,
        table: impl Into<String>,
        ttl_secs: u64,
        op_timeout: Duration,
    ) -> Self {
        Self {
            fast,
            durable,
            table: table.into(),
            ttl_secs,
            op_timeout,
        }
    }

    /// Returns the cached vector for `key`, or `None` on a miss in both tiers.
    pub async fn get(&self, key: &str) -> Option<Vec<f32>> {
        if let Some(raw) = self.guarded("fast get", self.fast.get(key)).await.flatten() {
            match decode_vector(&raw) {
                Some(vector) => {
                    debug!("Embedding cache hit (fast) for {key}");
                    return Some(vector);
                }
                None => warn!("Fast tier held an undecodable entry for {key}; ignoring"),
            }
        }

        let record = self
            .guarded("durable get", self.durable.get_item(&self.table, key))
            .await
            .flatten()?;

        let now = Utc::now().timestamp();
        if record.is_expired(now) {
            debug!("Durable record for {key} expired at {}", record.expires_at);
            return None;
        }
        let Some(vector) = decode_vector(&record.embedding) else {
            warn!("Durable tier held an undecodable entry for {key}; ignoring");
            return None;
        };

        debug!("Embedding cache hit (durable) for {key}");
        // Repopulate the fast tier for the rest of the record's lifetime.
        self.guarded(
            "fast repopulate",
            self.fast
                .set(key, &record.embedding, record.remaining_secs(now)),
        )
        .await;

        Some(vector)
    }

    /// Writes `vector` to both tiers. `ttl_secs` falls back to the configured TTL.
    pub async fn put(&self, key: &str, vector: &[f32], ttl_secs: Option<u64>) {
        let ttl = ttl_secs.unwrap_or(self.ttl_secs);

        let record = match DurableRecord::new(key, vector, ttl, Utc::now().timestamp_millis()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not encode embedding for {key}: {e}");
                return;
            }
        };

        self.guarded("fast set", self.fast.set(key, &record.embedding, ttl))
            .await;
        self.guarded("durable put", self.durable.put_item(&self.table, &record))
            .await;
    }

    /// Runs one tier operation under the op timeout. Any failure becomes `None`.
    async fn guarded<T>(
        &self,
        op: &str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!("Embedding cache {op} failed: {e:#}");
                None
            }
            Err(_) => {
                warn!(
                    "Embedding cache {op} timed out after {}ms",
                    self.op_timeout.as_millis()
                );
                None
            }
        }
    }
}

fn decode_vector(raw: &str) -> Option<Vec<f32>> {
    serde_json::from_str::<Vec<f32>>(raw)
        .ok()
        .filter(|v| !v.is_empty())
}
