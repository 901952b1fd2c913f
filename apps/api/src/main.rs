mod ats;
mod cache;
mod config;
mod db;
mod errors;
mod model_client;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ats::embedding::EmbeddingProvider;
use crate::ats::rubric::RubricEvaluator;
use crate::ats::AtsScorer;
use crate::cache::redis_tier::RedisTier;
use crate::cache::s3_tier::S3Tier;
use crate::cache::EmbeddingCache;
use crate::config::Config;
use crate::db::{create_pool, PgDocumentStore};
use crate::model_client::{HttpModelClient, ModelInvoker};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Document store
    let db = create_pool(&config.database_url).await?;

    // Fast cache tier
    let redis = redis::Client::open(config.redis_url.clone()).context("Invalid REDIS_URL")?;
    let fast_tier = RedisTier::connect(redis).await?;
    info!("Redis connection manager ready");

    // Durable cache tier
    let s3 = build_s3_client(&config).await;
    let durable_tier = S3Tier::new(s3, config.s3_bucket.clone());
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let model: Arc<dyn ModelInvoker> = Arc::new(
        HttpModelClient::new(
            &config.model_api_url,
            config.model_api_key.clone(),
            config.model_timeout,
        )
        .context("Failed to build model HTTP client")?,
    );
    info!(
        "Model client initialized (embed: {}, text: {})",
        config.embed_model_id, config.text_model_id
    );

    let cache = Arc::new(EmbeddingCache::new(
        Arc::new(fast_tier),
        Arc::new(durable_tier),
        config.embed_cache_table.clone(),
        config.embedding_cache_ttl_secs,
        config.cache_timeout,
    ));
    let scorer = AtsScorer::new(
        Arc::new(PgDocumentStore::new(db.clone())),
        EmbeddingProvider::new(model.clone(), cache, config.embed_model_id.clone()),
        RubricEvaluator::new(model, config.text_model_id.clone()),
        config.model_timeout,
    );

    let state = AppState {
        scorer: Arc::new(scorer),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Shut down cleanly");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Constructs an S3 client for AWS, or for MinIO / localstack when
/// `S3_ENDPOINT` is set.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "ats-static",
    );

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    // MinIO only serves path-style URLs.
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.s3_endpoint.is_some())
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
