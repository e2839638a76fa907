//! Shared document store used for game lobbies.
//!
//! Documents are JSON objects addressed by `(collection, id)`. Backends must
//! apply each write atomically; clients never lock on their side.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Result, TambolaError};
use crate::storage::Storage;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub type Document = serde_json::Map<String, Value>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_or_replace(&self, collection: &str, id: &str, document: Document)
        -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Appends `value` to the array `field` unless already present.
    async fn append_unique(&self, collection: &str, id: &str, field: &str, value: Value)
        -> Result<()>;

    async fn set_field(&self, collection: &str, id: &str, field: &str, value: Value)
        -> Result<()>;

    async fn subscribe(&self, collection: &str, id: &str) -> Result<Subscription>;
}

/// Live view of one document. Dropping it stops delivery.
pub struct Subscription {
    receiver: watch::Receiver<Option<Document>>,
    delivered_initial: bool,
    poller: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: watch::Receiver<Option<Document>>,
        poller: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            receiver,
            delivered_initial: false,
            poller,
        }
    }

    /// Waits for the next full document. The first call yields the current
    /// document if it exists. Returns `None` once the source is gone.
    pub async fn next(&mut self) -> Option<Document> {
        loop {
            if self.delivered_initial {
                if self.receiver.changed().await.is_err() {
                    return None;
                }
            }
            self.delivered_initial = true;

            if let Some(document) = self.receiver.borrow_and_update().clone() {
                return Some(document);
            }
        }
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// Ready/not-ready capability shared by everything that talks to the store.
#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Arc<RwLock<Option<Arc<dyn DocumentStore>>>>,
}

impl StoreHandle {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn ready(store: Arc<dyn DocumentStore>) -> Self {
        let handle = Self::pending();
        handle.install(store);
        handle
    }

    pub fn install(&self, store: Arc<dyn DocumentStore>) {
        *self.inner.write() = Some(store);
        tracing::debug!("Game store ready");
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn get(&self) -> Result<Arc<dyn DocumentStore>> {
        self.inner
            .read()
            .clone()
            .ok_or(TambolaError::StoreUnavailable)
    }
}

/// Opens the configured backend.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryDocumentStore::new())),
        StoreBackend::Sqlite => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| TambolaError::config("SQLite game store requires a path"))?;
            let storage = Arc::new(Storage::new(path).await?);
            tracing::info!("Connected to game store at {}", path.display());
            Ok(Arc::new(SqliteDocumentStore::new(
                storage,
                config.poll_interval(),
            )))
        }
    }
}

/// Set-union append. Returns whether the document changed.
pub(crate) fn append_unique_value(document: &mut Document, field: &str, value: Value) -> bool {
    match document.get_mut(field) {
        Some(Value::Array(items)) => {
            if items.contains(&value) {
                false
            } else {
                items.push(value);
                true
            }
        }
        _ => {
            document.insert(field.to_string(), Value::Array(vec![value]));
            true
        }
    }
}

/// Returns whether the document changed.
pub(crate) fn set_field_value(document: &mut Document, field: &str, value: Value) -> bool {
    if document.get(field) == Some(&value) {
        return false;
    }
    document.insert(field.to_string(), value);
    true
}
