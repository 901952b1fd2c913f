//! The single point of entry for every hosted-model call.
//!
//! Both the embedding model and the text-generation model are invoked through
//! the same `POST /model/{model_id}/invoke` endpoint with an `{"inputText": ...}`
//! body. Responses are handed back as untyped JSON; shaping them into vectors or
//! rubrics is the caller's job.
//!
//! No retries are attempted here. A failed call surfaces as a `ModelError`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}

/// Invokes a hosted model by id. Implemented over HTTP in production and by
/// scripted fakes in tests.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Sends `input_text` to `model_id`. A `timeout` overrides the client default
    /// for this call only.
    async fn invoke(
        &self,
        model_id: &str,
        input_text: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, ModelError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvokeRequest<'a> {
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModelApiError {
    message: String,
}

#[derive(Clone)]
pub struct HttpModelClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    default_timeout: Duration,
}

impl HttpModelClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        default_timeout: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: Client::builder().timeout(default_timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_timeout,
        })
    }

    fn invoke_url(&self, model_id: &str) -> String {
        format!("{}/model/{}/invoke", self.base_url, model_id)
    }
}

#[async_trait]
impl ModelInvoker for HttpModelClient {
    async fn invoke(
        &self,
        model_id: &str,
        input_text: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, ModelError> {
        let effective_timeout = timeout.unwrap_or(self.default_timeout);

        let mut request = self
            .client
            .post(self.invoke_url(model_id))
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .timeout(effective_timeout)
            .json(&InvokeRequest { input_text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify(e, effective_timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify(e, effective_timeout))?;

        if !status.is_success() {
            warn!("Model {model_id} returned {status}");
            let message = serde_json::from_str::<ModelApiError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Model {model_id} responded with {} bytes", body.len());
        Ok(parse_body(body))
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout(timeout)
    } else {
        ModelError::Http(err)
    }
}

/// Most models answer with JSON; some answer with plain text. Plain text is
/// kept as a JSON string so callers always see one value type.
fn parse_body(body: String) -> Value {
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}
