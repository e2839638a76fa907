use crate::document::{append_unique_value, set_field_value, Document, DocumentStore, Subscription};
use crate::error::{Result, TambolaError};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Document store on a SQLite file that several processes can share.
///
/// Every write bumps a per-document revision. Updates run in `IMMEDIATE`
/// transactions so concurrent read-modify-write cycles are serialized by the
/// database lock. Subscriptions poll the revision.
pub struct SqliteDocumentStore {
    storage: Arc<Storage>,
    poll_interval: Duration,
}

impl SqliteDocumentStore {
    pub fn new(storage: Arc<Storage>, poll_interval: Duration) -> Self {
        Self {
            storage,
            poll_interval,
        }
    }
}

fn update_document(
    conn: &mut Connection,
    collection: &str,
    id: &str,
    apply: impl FnOnce(&mut Document) -> bool,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let body: Option<String> = tx
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(body) = body else {
        return Err(TambolaError::document_not_found(collection, id));
    };

    let mut document: Document = serde_json::from_str(&body)?;
    if apply(&mut document) {
        tx.execute(
            "UPDATE documents SET body = ?1, revision = revision + 1, updated_at = ?2
             WHERE collection = ?3 AND id = ?4",
            params![
                serde_json::to_string(&document)?,
                Utc::now().timestamp(),
                collection,
                id
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

async fn read_document(
    storage: &Storage,
    collection: &str,
    id: &str,
) -> Result<Option<(i64, Document)>> {
    let row: Option<(i64, String)> = {
        let conn = storage.get_connection().await;
        conn.query_row(
            "SELECT revision, body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
    };

    match row {
        Some((revision, body)) => Ok(Some((revision, serde_json::from_str(&body)?))),
        None => Ok(None),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_or_replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<()> {
        let body = serde_json::to_string(&document)?;
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT INTO documents (collection, id, body, revision, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4)
             ON CONFLICT (collection, id) DO UPDATE SET
                body = excluded.body,
                revision = documents.revision + 1,
                updated_at = excluded.updated_at",
            params![collection, id, body, Utc::now().timestamp()],
        )?;

        tracing::debug!("Wrote document {}/{}", collection, id);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(read_document(&self.storage, collection, id)
            .await?
            .map(|(_, document)| document))
    }

    async fn append_unique(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        update_document(&mut conn, collection, id, |document| {
            append_unique_value(document, field, value)
        })
    }

    async fn set_field(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        update_document(&mut conn, collection, id, |document| {
            set_field_value(document, field, value)
        })
    }

    async fn subscribe(&self, collection: &str, id: &str) -> Result<Subscription> {
        let (sender, receiver) = watch::channel(None);
        let storage = self.storage.clone();
        let collection = collection.to_string();
        let id = id.to_string();
        let poll_interval = self.poll_interval;

        let poller = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            let mut last_revision = None;

            loop {
                tokio::select! {
                    _ = sender.closed() => break,
                    _ = interval.tick() => {
                        match read_document(&storage, &collection, &id).await {
                            Ok(Some((revision, document))) => {
                                if last_revision != Some(revision) {
                                    last_revision = Some(revision);
                                    sender.send_replace(Some(document));
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::warn!("Polling {}/{} failed: {}", collection, id, e);
                            }
                        }
                    }
                }
            }

            tracing::debug!("Stopped watching {}/{}", collection, id);
        });

        Ok(Subscription::new(receiver, Some(poller)))
    }
}
