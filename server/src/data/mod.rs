//! Data storage layer
//!
//! - `sqlite` - Tenant store (users, organizations, prompts, scenarios, ...)
//! - `types` - Row and input types shared with the domain layer
//! - `traits` - `TransactionalRepository`, the seam domain services depend on
//! - `error` - Backend-independent error type

pub mod error;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use sqlite::SqliteService;

pub use error::DataError;

pub use traits::TransactionalRepository;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::storage::AppStorage;

/// Transactional database service
///
/// Wraps the backend-specific service behind `Arc` so that repositories can
/// be handed out as trait objects.
pub enum TransactionalService {
    /// SQLite backend (embedded)
    Sqlite(Arc<SqliteService>),
}

impl TransactionalService {
    /// Open the database under the storage root and run migrations
    pub async fn init(storage: &AppStorage) -> Result<Self, DataError> {
        let service = SqliteService::init(storage).await?;
        Ok(Self::Sqlite(Arc::new(service)))
    }

    /// Migrated in-memory database for tests
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let service = SqliteService::in_memory()
            .await
            .expect("in-memory sqlite should open");
        Self::Sqlite(Arc::new(service))
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &sqlx::SqlitePool {
        match self {
            Self::Sqlite(s) => s.pool(),
        }
    }

    /// Run a WAL checkpoint
    pub async fn checkpoint(&self) -> Result<(), DataError> {
        match self {
            Self::Sqlite(s) => s.checkpoint().await.map_err(Into::into),
        }
    }

    /// Close the database connection gracefully
    pub async fn close(&self) {
        match self {
            Self::Sqlite(s) => s.close().await,
        }
    }

    /// Start the background checkpoint task
    pub fn start_checkpoint_task(&self, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        match self {
            Self::Sqlite(s) => s.start_checkpoint_task(shutdown_rx),
        }
    }

    /// Get the repository trait object for data operations
    pub fn repository(&self) -> Box<dyn TransactionalRepository + Send + Sync> {
        match self {
            Self::Sqlite(s) => Box::new(Arc::clone(s)),
        }
    }
}
