//! In-memory stand-ins for the external collaborators, shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{DurableRecord, DurableTier, FastTier};
use crate::db::DocumentStore;
use crate::model_client::{ModelError, ModelInvoker};
use crate::models::resume::ResumeDocument;

#[derive(Default)]
pub struct MemoryFastTier {
    entries: Mutex<HashMap<String, (String, u64)>>,
}

impl MemoryFastTier {
    pub fn entry(&self, key: &str) -> Option<(String, u64)> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), 0));
    }
}

#[async_trait]
impl FastTier for MemoryFastTier {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entry(key).map(|(value, _)| value))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDurableTier {
    records: Mutex<HashMap<(String, String), DurableRecord>>,
}

impl MemoryDurableTier {
    pub fn insert(&self, table: &str, record: DurableRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((table.to_string(), record.id.clone()), record);
    }

    pub fn record(&self, table: &str, id: &str) -> Option<DurableRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(table.to_string(), id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DurableTier for MemoryDurableTier {
    async fn get_item(&self, table: &str, id: &str) -> Result<Option<DurableRecord>> {
        Ok(self.record(table, id))
    }

    async fn put_item(&self, table: &str, record: &DurableRecord) -> Result<()> {
        self.insert(table, record.clone());
        Ok(())
    }
}

/// A cache backend that is always down.
pub struct FailingTier;

#[async_trait]
impl FastTier for FailingTier {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("connection refused"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
}

#[async_trait]
impl DurableTier for FailingTier {
    async fn get_item(&self, _table: &str, _id: &str) -> Result<Option<DurableRecord>> {
        Err(anyhow!("access denied"))
    }

    async fn put_item(&self, _table: &str, _record: &DurableRecord) -> Result<()> {
        Err(anyhow!("access denied"))
    }
}

/// A cache backend that never answers.
pub struct HangingTier;

#[async_trait]
impl FastTier for HangingTier {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<()> {
        std::future::pending().await
    }
}

type Responder = Arc<dyn Fn(&str) -> Result<Value, ModelError> + Send + Sync>;

/// Model fake answering per model id. Unscripted ids fail with a 404.
#[derive(Default)]
pub struct ScriptedModel {
    responders: HashMap<String, Responder>,
    calls: Mutex<Vec<(String, String, Option<Duration>)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, model_id: &str, value: Value) -> Self {
        self.respond_with(model_id, move |_| value.clone())
    }

    pub fn respond_with(
        mut self,
        model_id: &str,
        f: impl Fn(&str) -> Value + Send + Sync + 'static,
    ) -> Self {
        let responder: Responder =
            Arc::new(move |input: &str| -> Result<Value, ModelError> { Ok(f(input)) });
        self.responders.insert(model_id.to_string(), responder);
        self
    }

    pub fn fail(mut self, model_id: &str, err: ModelError) -> Self {
        let (status, message, timeout) = match err {
            ModelError::Api { status, message } => (status, message, None),
            ModelError::Timeout(d) => (0, String::new(), Some(d)),
            ModelError::Http(e) => panic!("cannot script a reqwest error: {e}"),
        };
        let responder: Responder = Arc::new(move |_: &str| -> Result<Value, ModelError> {
            Err(match timeout {
                Some(d) => ModelError::Timeout(d),
                None => ModelError::Api {
                    status,
                    message: message.clone(),
                },
            })
        });
        self.responders.insert(model_id.to_string(), responder);
        self
    }

    pub fn call_count(&self, model_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| id == model_id)
            .count()
    }

    /// Inputs sent to `model_id`, in call order.
    pub fn inputs(&self, model_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| id == model_id)
            .map(|(_, input, _)| input.clone())
            .collect()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, timeout)| *timeout)
            .collect()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedModel {
    async fn invoke(
        &self,
        model_id: &str,
        input_text: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, ModelError> {
        self.calls.lock().unwrap().push((
            model_id.to_string(),
            input_text.to_string(),
            timeout,
        ));
        match self.responders.get(model_id) {
            Some(responder) => responder(input_text),
            None => Err(ModelError::Api {
                status: 404,
                message: format!("unknown model {model_id}"),
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: HashMap<String, ResumeDocument>,
}

impl MemoryDocumentStore {
    pub fn with(mut self, document: ResumeDocument) -> Self {
        self.documents.insert(document.id.clone(), document);
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeDocument>> {
        Ok(self.documents.get(id).cloned())
    }
}
