//! Data access layer.
//!
//! - [`store`]: the repository traits every backend implements
//! - [`connection`]: the lazily connected, process-wide [`ConnectionCache`](connection::ConnectionCache)
//! - [`postgres`] and [`in_memory`]: the two backends
//! - [`models`]: records going in and out of the store
//! - [`errors`]: [`DbError`](errors::DbError), including the "store unavailable" case
//!
//! The backend is picked from the database URL: `memory://` selects the in-memory store,
//! anything else is handed to Postgres.

pub mod connection;
pub mod errors;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;

use crate::config::DatabaseConfig;
use connection::{ConnectionCache, Connector};
use in_memory::MemoryConnector;
use postgres::PgConnector;

/// Connector matching the scheme of `config.url`.
pub fn connector_for(config: &DatabaseConfig) -> Arc<dyn Connector> {
    if config.is_in_memory() {
        Arc::new(MemoryConnector)
    } else {
        Arc::new(PgConnector::from(config))
    }
}

/// Connection cache for `config`. Nothing connects until the first request.
pub fn connection_cache(config: &DatabaseConfig) -> ConnectionCache {
    ConnectionCache::new(config.url.clone(), connector_for(config))
}
