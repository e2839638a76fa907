use crate::document::{append_unique_value, set_field_value, Document, DocumentStore, Subscription};
use crate::error::{Result, TambolaError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::watch;

type DocumentKey = (String, String);

/// In-process store. Each document lives in its own watch channel so
/// subscribers always see the latest body.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<DocumentKey, watch::Sender<Option<Document>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        apply: impl FnOnce(&mut Document) -> bool,
    ) -> Result<()> {
        let documents = self.documents.lock();
        let sender = documents
            .get(&key(collection, id))
            .ok_or_else(|| TambolaError::document_not_found(collection, id))?;

        let mut missing = false;
        sender.send_if_modified(|slot| match slot {
            Some(document) => apply(document),
            None => {
                missing = true;
                false
            }
        });

        if missing {
            return Err(TambolaError::document_not_found(collection, id));
        }
        Ok(())
    }
}

fn key(collection: &str, id: &str) -> DocumentKey {
    (collection.to_string(), id.to_string())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_or_replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<()> {
        let mut documents = self.documents.lock();
        documents
            .entry(key(collection, id))
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(document));
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let documents = self.documents.lock();
        Ok(documents
            .get(&key(collection, id))
            .and_then(|sender| sender.borrow().clone()))
    }

    async fn append_unique(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<()> {
        self.update(collection, id, |document| {
            append_unique_value(document, field, value)
        })
    }

    async fn set_field(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<()> {
        self.update(collection, id, |document| {
            set_field_value(document, field, value)
        })
    }

    async fn subscribe(&self, collection: &str, id: &str) -> Result<Subscription> {
        let mut documents = self.documents.lock();
        // Waiting slots for ids that were never created die with their last subscriber
        documents.retain(|_, sender| sender.borrow().is_some() || sender.receiver_count() > 0);

        let receiver = documents
            .entry(key(collection, id))
            .or_insert_with(|| watch::channel(None).0)
            .subscribe();
        Ok(Subscription::new(receiver, None))
    }
}
