pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::filter::FilterWhere;
use crate::middleware::AuthUser;
use crate::types::{Record, RecordId, Table};

pub use memory::{Fixture, MemoryStore};
pub use postgres::PgStore;

/// Errors reported by a data store. Their `Display` text is what callers see as the upstream message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot coerce the result to a single JSON object: id {id} matched {rows} rows in {table}")]
    NotSingleRow { table: Table, id: String, rows: usize },

    #[error("duplicate key value violates unique constraint \"{0}_pkey\"")]
    DuplicateKey(Table),

    #[error("nextval: reached maximum value of sequence \"{0}_id_seq\" (9223372036854775807)")]
    SequenceExhausted(Table),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Unexpected row format: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// The hosted-table collaborator the dispatcher forwards to.
///
/// Every call carries the caller's verified identity so implementations can scope access
/// (the PostgreSQL store forwards the claims to row-level security).
#[async_trait]
pub trait DataStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert one record and return it as stored.
    async fn insert(&self, auth: &AuthUser, table: Table, record: Record) -> Result<Record, StoreError>;

    /// All records satisfying every equality in `filter`.
    async fn select(&self, auth: &AuthUser, table: Table, filter: &FilterWhere) -> Result<Vec<Record>, StoreError>;

    /// Merge `patch` into the single record whose `id` equals `id` and return it.
    async fn update_by_id(
        &self,
        auth: &AuthUser,
        table: Table,
        id: &RecordId,
        patch: Record,
    ) -> Result<Record, StoreError>;

    /// Remove the single record whose `id` equals `id` and return it.
    async fn delete_by_id(&self, auth: &AuthUser, table: Table, id: &RecordId) -> Result<Record, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Build the configured store.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DataStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            if let Some(path) = &config.fixture {
                let fixture = MemoryStore::load_fixture(path).await?;
                let count = store.seed(fixture).await?;
                tracing::info!("Seeded memory store with {} records from {}", count, path.display());
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => Ok(Arc::new(PgStore::connect(config).await?)),
    }
}
