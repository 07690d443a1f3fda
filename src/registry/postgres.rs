//! PostgreSQL client store

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use super::{ClientRecord, ClientStore};
use crate::config::PostgresConfig;
use crate::error::{Error, Result};

/// PostgreSQL connection pool type alias
pub type PostgresPool = PgPool;

/// Initialize the PostgreSQL connection pool
pub async fn init_pool(config: &PostgresConfig) -> Result<PostgresPool> {
    info!("Initializing PostgreSQL connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(config.url.expose_secret())
        .await?;

    // Verify connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("PostgreSQL connection pool initialized successfully");
    Ok(pool)
}

/// Database migrations
pub mod migrations {
    use super::*;

    /// Run all migrations
    pub async fn run(pool: &PgPool) -> Result<()> {
        info!("Running database migrations");

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS clients (
                registration_token TEXT PRIMARY KEY,
                string_identifier TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#)
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clients_created_at ON clients(created_at)")
            .execute(pool)
            .await?;

        info!("Database migrations completed");
        Ok(())
    }
}

/// Client store backed by the `clients` table
#[derive(Clone)]
pub struct PgClientStore {
    pool: PostgresPool,
}

impl PgClientStore {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    fn id(&self) -> &str {
        "postgres"
    }

    async fn exists(&self, token: &str) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM clients WHERE registration_token = $1)",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn create(&self, record: &ClientRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO clients (registration_token, string_identifier) VALUES ($1, $2)",
        )
        .bind(&record.registration_token)
        .bind(&record.string_identifier)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, token: &str, label: Option<&str>) -> Result<()> {
        let result = sqlx::query(r#"
            UPDATE clients
            SET string_identifier = $2, updated_at = NOW()
            WHERE registration_token = $1
        "#)
        .bind(token)
        .bind(label)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(token.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM clients WHERE registration_token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(token.to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ClientRecord>> {
        let clients: Vec<ClientRecord> = sqlx::query_as(
            "SELECT registration_token, string_identifier FROM clients ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(clients)
    }
}
