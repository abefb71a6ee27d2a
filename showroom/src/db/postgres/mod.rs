//! PostgreSQL store backend.
//!
//! Queries are built at runtime (`sqlx::query_as` / `QueryBuilder`) rather than with the
//! compile-time checked macros, so the crate builds without a live database. Enum columns are
//! `TEXT` with `CHECK` constraints and are converted through their `FromStr` impls.

mod attributes;
mod cars;
mod inquiries;
mod users;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, instrument};

use super::{
    connection::{Connector, StoreHandle},
    errors::{DbError, Result},
    store::Store,
};
use crate::config::DatabaseConfig;

/// Store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// Parse a `TEXT` enum column, reporting bad values as opaque store errors.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| DbError::Other(anyhow::anyhow!("invalid value in column {column}: {e}")))
}

/// Escape `LIKE` wildcards and wrap the term for a substring match.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

/// Opens a pool and, if configured, applies pending migrations.
#[derive(Debug, Clone)]
pub struct PgConnector {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub run_migrations: bool,
}

impl From<&DatabaseConfig> for PgConnector {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            acquire_timeout: config.acquire_timeout,
            run_migrations: config.run_migrations,
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    #[instrument(skip_all, fields(max_connections = self.max_connections), err)]
    async fn connect(&self, uri: &str) -> Result<StoreHandle> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(uri)
            .await
            .map_err(|e| DbError::Unavailable { message: e.to_string() })?;

        if self.run_migrations {
            crate::migrator().run(&pool).await?;
            info!("Database migrations applied");
        }

        Ok(Arc::new(PgStore::new(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::Role;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("golf"), "%golf%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(parse_column::<Role>("role", "editor").unwrap(), Role::Editor);
        assert!(matches!(parse_column::<Role>("role", "root"), Err(DbError::Other(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_unreachable_database_is_unavailable() {
        let connector = PgConnector {
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: Duration::from_millis(200),
            run_migrations: false,
        };

        let err = connector.connect("postgres://showroom@127.0.0.1:1/showroom").await.unwrap_err();
        assert!(matches!(err, DbError::Unavailable { .. }), "got {err:?}");
    }
}
