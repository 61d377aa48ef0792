mod models;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use schema::CONCERT_VERSIONED_SCHEMAS;
pub use store::SqliteConcertStore;
pub use trait_def::ConcertStore;

use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs synchronous [`ConcertStore`] calls on the blocking pool under a timeout,
/// mapping failures onto [`Error`].
#[derive(Clone)]
pub struct BlockingStore {
    store: Arc<dyn ConcertStore>,
    timeout: Duration,
}

impl BlockingStore {
    pub fn new(store: Arc<dyn ConcertStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn inner(&self) -> &Arc<dyn ConcertStore> {
        &self.store
    }

    pub async fn read<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ConcertStore) -> anyhow::Result<T> + Send + 'static,
    {
        self.run(op, f).await.map_err(|e| match e {
            RunError::Timeout => Error::StoreTimeout,
            RunError::Failed(e) => Error::StoreReadFailed(e),
        })
    }

    pub async fn write<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ConcertStore) -> anyhow::Result<T> + Send + 'static,
    {
        self.run(op, f).await.map_err(|e| match e {
            RunError::Timeout => Error::StoreTimeout,
            RunError::Failed(e) => Error::StoreWriteFailed(e),
        })
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> std::result::Result<T, RunError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ConcertStore) -> anyhow::Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let task = tokio::task::spawn_blocking(move || f(store.as_ref()));
        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                warn!(op, timeout_secs = self.timeout.as_secs(), "Store call timed out");
                Err(RunError::Timeout)
            }
            Ok(Err(join_err)) => {
                warn!(op, "Store task aborted: {}", join_err);
                Err(RunError::Failed(anyhow::anyhow!(
                    "store task for {} aborted: {}",
                    op,
                    join_err
                )))
            }
            Ok(Ok(Err(e))) => {
                warn!(op, "Store call failed: {:#}", e);
                Err(RunError::Failed(e))
            }
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}

enum RunError {
    Timeout,
    Failed(anyhow::Error),
}
