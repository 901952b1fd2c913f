use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::cache::{DurableRecord, DurableTier};

/// Durable tier backed by an S3 bucket. Each record is one JSON object at
/// `<table>/<id>.json`. S3 has no per-object TTL, so expiry is enforced by the
/// cache on read.
pub struct S3Tier {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Tier {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

fn object_key(table: &str, id: &str) -> String {
    format!("{table}/{id}.json")
}

fn decode_record(bytes: &[u8]) -> Result<DurableRecord> {
    serde_json::from_slice(bytes).context("Durable cache record is not valid JSON")
}

#[async_trait]
impl DurableTier for S3Tier {
    async fn get_item(&self, table: &str, id: &str) -> Result<Option<DurableRecord>> {
        let key = object_key(table, id);
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    debug!("No durable record at s3://{}/{}", self.bucket, key);
                    return Ok(None);
                }
                return Err(anyhow!("S3 get of {key} failed: {err}"));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read S3 object {key}"))?
            .into_bytes();

        decode_record(&bytes).map(Some)
    }

    async fn put_item(&self, table: &str, record: &DurableRecord) -> Result<()> {
        let key = object_key(table, &record.id);
        let body = serde_json::to_vec(record)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow!("S3 put of {key} failed: {e}"))?;

        debug!("Wrote durable record to s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
