//! Text in, vector out, with the embedding cache in front.
//!
//! Providers disagree about where the vector lives in the response, so the
//! payload stays an untyped `serde_json::Value` at this boundary and is run
//! through an ordered list of extraction strategies. The first hit wins.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::ats::AtsError;
use crate::cache::{hash_key, EmbeddingCache};
use crate::model_client::ModelInvoker;

type Strategy = fn(&Value) -> Option<Vec<f32>>;

/// Tried in this order.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("bare_array", bare_array),
    ("embeddings_list", embeddings_list),
    ("embedding_field", embedding_field),
    ("results_list", results_list),
    ("first_numeric_property", first_numeric_property),
];

pub struct EmbeddingProvider {
    model: Arc<dyn ModelInvoker>,
    cache: Arc<EmbeddingCache>,
    model_id: String,
}

impl EmbeddingProvider {
    pub fn new(
        model: Arc<dyn ModelInvoker>,
        cache: Arc<EmbeddingCache>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            model,
            cache,
            model_id: model_id.into(),
        }
    }

    /// Returns the embedding for `text`, from cache when possible.
    ///
    /// A cache write failure never fails the call: the vector is already in hand.
    pub async fn embed(&self, text: &str, timeout: Option<Duration>) -> Result<Vec<f32>, AtsError> {
        let key = hash_key(text);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Embedding served from cache ({} dims)", cached.len());
            return Ok(cached);
        }

        let payload = self.model.invoke(&self.model_id, text, timeout).await?;
        let embedding = extract_embedding(&payload).ok_or(AtsError::EmbeddingUnavailable)?;
        info!(
            "Embedded {} chars with {} ({} dims)",
            text.chars().count(),
            self.model_id,
            embedding.len()
        );

        self.cache.put(&key, &embedding, None).await;
        Ok(embedding)
    }
}

/// Pulls a non-empty numeric vector out of a provider payload.
pub fn extract_embedding(payload: &Value) -> Option<Vec<f32>> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let vector = strategy(payload)?;
        debug!("Embedding extracted via {name}");
        Some(vector)
    })
}

/// A non-empty array whose every element is a number.
fn numeric_array(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items.iter().map(|v| v.as_f64().map(|n| n as f32)).collect()
}

/// `[0.1, 0.2, ...]`
fn bare_array(payload: &Value) -> Option<Vec<f32>> {
    numeric_array(payload)
}

/// `{"embeddings": [{"embedding": [...]}]}` or `{"embeddings": [[...]]}`
fn embeddings_list(payload: &Value) -> Option<Vec<f32>> {
    let first = payload.get("embeddings")?.as_array()?.first()?;
    first
        .get("embedding")
        .and_then(numeric_array)
        .or_else(|| numeric_array(first))
}

/// `{"embedding": [...]}`
fn embedding_field(payload: &Value) -> Option<Vec<f32>> {
    numeric_array(payload.get("embedding")?)
}

/// `{"results": [{"embedding": [...]}]}` or `{"results": [{"output": {"embedding": [...]}}]}`
fn results_list(payload: &Value) -> Option<Vec<f32>> {
    let first = payload.get("results")?.as_array()?.first()?;
    first
        .get("embedding")
        .and_then(numeric_array)
        .or_else(|| first.get("output")?.get("embedding").and_then(numeric_array))
}

/// Last resort: the first property holding a numeric array, or an array whose
/// first element is one. Relies on `serde_json`'s `preserve_order` so "first"
/// means first in the response.
fn first_numeric_property(payload: &Value) -> Option<Vec<f32>> {
    payload.as_object()?.values().find_map(|value| {
        numeric_array(value).or_else(|| numeric_array(value.as_array()?.first()?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EmbeddingCache, DEFAULT_TTL_SECS};
    use crate::model_client::ModelError;
    use crate::testing::{FailingTier, MemoryDurableTier, MemoryFastTier, ScriptedModel};
    use serde_json::json;

    const MODEL: &str = "embedder";

    fn provider(model: Arc<ScriptedModel>, cache: EmbeddingCache) -> EmbeddingProvider {
        EmbeddingProvider::new(model, Arc::new(cache), MODEL)
    }

    fn memory_cache() -> EmbeddingCache {
        EmbeddingCache::new(
            Arc::new(MemoryFastTier::default()),
            Arc::new(MemoryDurableTier::default()),
            "embeddings",
            DEFAULT_TTL_SECS,
            Duration::from_millis(200),
        )
    }

    #[test]
    fn test_extract_bare_array() {
        assert_eq!(
            extract_embedding(&json!([0.1, 0.2, 0.3])),
            Some(vec![0.1, 0.2, 0.3])
        );
    }

    #[test]
    fn test_extract_embeddings_list_of_objects() {
        let payload = json!({"embeddings": [{"embedding": [1.0, 2.0]}, {"embedding": [9.0]}]});
        assert_eq!(extract_embedding(&payload), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_extract_embeddings_list_of_vectors() {
        let payload = json!({"embeddings": [[0.5, 0.5], [1.0, 1.0]]});
        assert_eq!(extract_embedding(&payload), Some(vec![0.5, 0.5]));
    }

    #[test]
    fn test_extract_titan_shape() {
        let payload = json!({"embedding": [0.25, -0.75], "inputTextTokenCount": 4});
        assert_eq!(extract_embedding(&payload), Some(vec![0.25, -0.75]));
    }

    #[test]
    fn test_extract_results_direct_and_nested() {
        let direct = json!({"results": [{"embedding": [3.0]}]});
        assert_eq!(extract_embedding(&direct), Some(vec![3.0]));

        let nested = json!({"results": [{"output": {"embedding": [4.0, 5.0]}}]});
        assert_eq!(extract_embedding(&nested), Some(vec![4.0, 5.0]));
    }

    #[test]
    fn test_extract_first_numeric_property_in_response_order() {
        let payload = json!({"model": "x", "vector": [1.5, 2.5], "other": [9.0]});
        assert_eq!(extract_embedding(&payload), Some(vec![1.5, 2.5]));

        let wrapped = json!({"data": [[6.0, 7.0]]});
        assert_eq!(extract_embedding(&wrapped), Some(vec![6.0, 7.0]));
    }

    #[test]
    fn test_extract_rejects_unusable_payloads() {
        assert_eq!(extract_embedding(&json!([])), None);
        assert_eq!(extract_embedding(&json!({"embedding": []})), None);
        assert_eq!(extract_embedding(&json!({"embedding": ["a", "b"]})), None);
        assert_eq!(extract_embedding(&json!("plain text")), None);
        assert_eq!(extract_embedding(&json!({"status": "ok"})), None);
        assert_eq!(extract_embedding(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_embed_bare_array_response() {
        let model = Arc::new(ScriptedModel::new().respond(MODEL, json!([0.1, 0.2, 0.3])));
        let provider = provider(model, memory_cache());

        let vector = provider.embed("some text", None).await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_second_call_hits_cache() {
        let model = Arc::new(ScriptedModel::new().respond(MODEL, json!({"embedding": [1.0, 0.0]})));
        let provider = provider(model.clone(), memory_cache());

        let first = provider.embed("same text", None).await.unwrap();
        let second = provider.embed("same text", None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(model.call_count(MODEL), 1);
    }

    #[tokio::test]
    async fn test_embed_distinct_text_calls_model_again() {
        let model = Arc::new(ScriptedModel::new().respond(MODEL, json!({"embedding": [1.0]})));
        let provider = provider(model.clone(), memory_cache());

        provider.embed("text one", None).await.unwrap();
        provider.embed("text two", None).await.unwrap();

        assert_eq!(model.call_count(MODEL), 2);
    }

    #[tokio::test]
    async fn test_embed_unparseable_response_is_embedding_unavailable() {
        let model = Arc::new(ScriptedModel::new().respond(MODEL, json!({"status": "ok"})));
        let provider = provider(model, memory_cache());

        let err = provider.embed("text", None).await.unwrap_err();
        assert!(matches!(err, AtsError::EmbeddingUnavailable), "got {err:?}");
    }

    #[tokio::test]
    async fn test_embed_transport_failure_propagates() {
        let model = Arc::new(ScriptedModel::new().fail(
            MODEL,
            ModelError::Api {
                status: 503,
                message: "overloaded".to_string(),
            },
        ));
        let provider = provider(model, memory_cache());

        let err = provider.embed("text", None).await.unwrap_err();
        assert!(
            matches!(err, AtsError::Transport(ModelError::Api { status: 503, .. })),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_embed_survives_broken_cache() {
        let model = Arc::new(ScriptedModel::new().respond(MODEL, json!([2.0, 3.0])));
        let cache = EmbeddingCache::new(
            Arc::new(FailingTier),
            Arc::new(FailingTier),
            "embeddings",
            DEFAULT_TTL_SECS,
            Duration::from_millis(200),
        );
        let provider = provider(model.clone(), cache);

        assert_eq!(provider.embed("t", None).await.unwrap(), vec![2.0, 3.0]);
        assert_eq!(provider.embed("t", None).await.unwrap(), vec![2.0, 3.0]);
        assert_eq!(model.call_count(MODEL), 2);
    }
}
