use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::models::resume::{ResumeDocument, ResumeRow};

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Read-only access to resume documents owned by the CRUD service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeDocument>>;
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeDocument>> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT id, user_id, data, updated_at FROM resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load resume {id}"))?;

        row.map(document_from_row).transpose()
    }
}

/// The row's key columns win over whatever the JSON body claims.
fn document_from_row(row: ResumeRow) -> Result<ResumeDocument> {
    debug!("Loaded resume {} (updated {})", row.id, row.updated_at);
    let mut document: ResumeDocument = serde_json::from_value(row.data)
        .with_context(|| format!("Resume {} has a malformed document body", row.id))?;
    document.id = row.id;
    document.user_id = row.user_id;
    Ok(document)
}
