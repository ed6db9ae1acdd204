use reqwest::Client;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sqlx::postgres::PgPool;
use tokio::sync::watch;

use crate::config::Config;
use crate::services::{SqlPool, ValueCipher};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// SeaORM connection to the engine's own store
    pub db: DatabaseConnection,
    /// Named data sources steps may cross-check with SQL
    pub sql: SqlPool,
    /// Cipher for encrypted variable values
    pub cipher: ValueCipher,
    /// HTTP client shared by every step request
    pub http: Client,
    /// Flips to true when runs must stop issuing further steps
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Connect to the store, run migrations and open the SQL data sources
    pub async fn new(
        config: &Config,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, AppStateError> {
        // SQLx pool for migrations only
        let pg_pool = PgPool::connect(&config.database_url)
            .await
            .map_err(|e| AppStateError::Postgres(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pg_pool)
            .await
            .map_err(|e| AppStateError::Migration(e.to_string()))?;

        // Connect with SeaORM for everything else
        let mut opt = ConnectOptions::new(&config.database_url);
        opt.max_connections(100)
            .min_connections(5)
            .sqlx_logging(true);

        let db = Database::connect(opt)
            .await
            .map_err(|e| AppStateError::Postgres(e.to_string()))?;

        let sql = SqlPool::from_config(&config.sql_databases)
            .await
            .map_err(|e| AppStateError::SqlSource(e.to_string()))?;

        Ok(Self {
            db,
            sql,
            cipher: ValueCipher::new(&config.variable_secret),
            http: Client::new(),
            shutdown,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("PostgreSQL connection error: {0}")]
    Postgres(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("SQL data source error: {0}")]
    SqlSource(String),
}
