use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::DEFAULT_TTL_SECS;

const DEFAULT_EMBED_MODEL_ID: &str = "amazon.titan-embed-text-v2:0";
const DEFAULT_TEXT_MODEL_ID: &str = "amazon.titan-text-lite-v1";
const DEFAULT_CACHE_TABLE: &str = "resume-embedding-cache";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    /// Custom endpoint for MinIO / localstack. `None` talks to AWS.
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub model_api_url: String,
    pub model_api_key: Option<String>,
    pub embed_model_id: String,
    pub text_model_id: String,
    pub embedding_cache_ttl_secs: u64,
    pub embed_cache_table: String,
    pub model_timeout: Duration,
    pub cache_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: optional_env("S3_ENDPOINT"),
            aws_region: optional_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            model_api_url: require_env("MODEL_API_URL")?,
            model_api_key: optional_env("MODEL_API_KEY"),
            embed_model_id: optional_env("EMBED_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL_ID.to_string()),
            text_model_id: optional_env("TEXT_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL_ID.to_string()),
            embedding_cache_ttl_secs: parse_env("EMBEDDING_CACHE_TTL_SECONDS", DEFAULT_TTL_SECS)?,
            embed_cache_table: optional_env("EMBED_CACHE_TABLE")
                .unwrap_or_else(|| DEFAULT_CACHE_TABLE.to_string()),
            model_timeout: Duration::from_secs(parse_env("MODEL_TIMEOUT_SECS", 60)?),
            cache_timeout: Duration::from_millis(parse_env("CACHE_TIMEOUT_MS", 500)?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and empty values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
