//! Operator configuration access
//!
//! The configuration collaborator only knows how to load and save the whole
//! blob ([`ConfigStore`]). [`Database`] layers narrow, validated operations on
//! top of it and serializes every read-modify-write behind one lock so two
//! mutations can never lose each other's changes.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::{AppResult, RepositoryResult};
use crate::models::SourceRegistry;

pub mod epg_files;
pub mod json_store;
pub mod sources;

pub use json_store::{InMemoryConfigStore, JsonFileConfigStore};

/// Whole-blob persistence for the operator configuration
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> RepositoryResult<SourceRegistry>;
    async fn save(&self, registry: &SourceRegistry) -> RepositoryResult<()>;

    /// Upgrade records written by older versions in place, returning how
    /// many were changed
    async fn migrate(&self) -> RepositoryResult<usize> {
        Ok(0)
    }
}

#[derive(Clone)]
pub struct Database {
    store: Arc<dyn ConfigStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Configuration kept in memory only
    pub fn in_memory(registry: SourceRegistry) -> Self {
        Self::new(Arc::new(InMemoryConfigStore::new(registry)))
    }

    /// Configuration persisted as a JSON file at `path`
    pub fn json_file<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(Arc::new(JsonFileConfigStore::new(path)))
    }

    /// Copy of the full configuration, used as the input of one pass
    pub async fn snapshot(&self) -> AppResult<SourceRegistry> {
        Ok(self.store.load().await?)
    }

    /// Bring stored configuration up to date before it is served.
    ///
    /// Runs under the write lock so it cannot interleave with a mutation.
    pub async fn migrate(&self) -> AppResult<usize> {
        let _guard = self.write_lock.lock().await;
        Ok(self.store.migrate().await?)
    }

    /// Load, modify and save the configuration under the write lock.
    ///
    /// Nothing is saved when `f` returns an error.
    async fn mutate<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut SourceRegistry) -> AppResult<T>,
    {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.store.load().await?;
        let result = f(&mut registry)?;
        self.store.save(&registry).await?;
        Ok(result)
    }
}
