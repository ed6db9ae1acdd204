use std::collections::HashMap;

use futures::future;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbErr, FromQueryResult, JsonValue, Statement,
};

use crate::error::{AppError, AppResult};

/// Data source name used when a query names none
pub const DEFAULT_SOURCE: &str = "default";

/// Named connections to the databases steps may cross-check against.
///
/// These are the targets under test, not the engine's own store; they are
/// connected once at startup from configuration and shared by every run.
#[derive(Clone, Default)]
pub struct SqlPool {
    connections: HashMap<String, DatabaseConnection>,
}

impl SqlPool {
    /// Connect every configured `name=url` data source
    pub async fn from_config(entries: &[(String, String)]) -> AppResult<Self> {
        let connections = future::try_join_all(entries.iter().map(|(name, url)| async move {
            let conn = Database::connect(url.as_str()).await?;
            Ok::<_, DbErr>((name.clone(), conn))
        }))
        .await?;

        Ok(Self {
            connections: connections.into_iter().collect(),
        })
    }

    /// Register a named data source
    pub fn register(&mut self, name: impl Into<String>, conn: DatabaseConnection) {
        self.connections.insert(name.into(), conn);
    }

    /// Run one query and return its rows as JSON objects
    pub async fn run_query(&self, database: Option<&str>, sql: &str) -> AppResult<Vec<JsonValue>> {
        let name = database.unwrap_or(DEFAULT_SOURCE);
        let conn = self
            .connections
            .get(name)
            .ok_or_else(|| AppError::Validation(format!("unknown SQL data source '{}'", name)))?;

        let rows = JsonValue::find_by_statement(Statement::from_string(
            conn.get_database_backend(),
            sql.to_string(),
        ))
        .all(conn)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_source_is_rejected() {
        let pool = SqlPool::default();

        let err = pool.run_query(None, "select 1").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = pool.run_query(Some("replica"), "select 1").await.unwrap_err();
        assert!(err.to_string().contains("replica"));
    }
}
