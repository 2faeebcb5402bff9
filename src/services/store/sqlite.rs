use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::broadcast;

use super::{Collection, Document, RecordStore, StoreError, StoreEvent, Subscription};
use crate::db::queries;

const CHANNEL_CAPACITY: usize = 64;

/// Local document store on SQLite. Every acknowledged write or delete
/// publishes the full collection to its subscribers, the way a realtime
/// database pushes `value` events.
pub struct SqliteRecordStore {
    db: Arc<Mutex<Connection>>,
    bookings_tx: broadcast::Sender<StoreEvent>,
    history_tx: broadcast::Sender<StoreEvent>,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        let (bookings_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (history_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(conn)),
            bookings_tx,
            history_tx,
        }
    }

    fn sender(&self, collection: Collection) -> &broadcast::Sender<StoreEvent> {
        match collection {
            Collection::Bookings => &self.bookings_tx,
            Collection::History => &self.history_tx,
        }
    }

    /// Must be called with the connection still locked, so snapshots go
    /// out in the same order the writes were applied.
    fn publish(&self, db: &Connection, collection: Collection) {
        let event = match queries::list_documents(db, collection) {
            Ok(documents) => StoreEvent::Snapshot(documents),
            Err(e) => {
                tracing::error!(error = %e, collection = %collection, "failed to read collection for subscribers");
                StoreEvent::Error(e.to_string())
            }
        };
        // Nobody listening is fine.
        let _ = self.sender(collection).send(event);
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        // Subscribe while holding the lock so no write slips between the
        // initial read and the first event.
        let receiver = self.sender(collection).subscribe();
        let initial = queries::list_documents(&db, collection)?;
        Ok(Subscription::new(initial, receiver))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        queries::list_documents(&db, collection)
    }

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        queries::get_document(&db, collection, id)
    }

    async fn write(
        &self,
        collection: Collection,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        queries::put_document(&db, collection, id, body)?;
        tracing::debug!(collection = %collection, id, "document written");
        self.publish(&db, collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        let removed = queries::delete_document(&db, collection, id)?;
        tracing::debug!(collection = %collection, id, removed, "document deleted");
        if removed {
            self.publish(&db, collection);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        queries::query_documents(&db, collection, field, value)
    }
}
