pub mod firebase;
pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// The two top-level collections the console works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Bookings,
    History,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Bookings => "bookings",
            Collection::History => "history",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyed document as the store returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("document decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// What a subscription delivers after the initial snapshot.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The full current contents of the collection.
    Snapshot(Vec<Document>),
    Error(String),
    /// The receiver fell behind; the consumer should re-read the collection.
    Lagged(u64),
}

/// A live view of one collection. Dropping it unsubscribes.
pub struct Subscription {
    pub initial: Vec<Document>,
    receiver: broadcast::Receiver<StoreEvent>,
    poller: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(initial: Vec<Document>, receiver: broadcast::Receiver<StoreEvent>) -> Self {
        Self {
            initial,
            receiver,
            poller: None,
        }
    }

    pub fn with_poller(mut self, poller: JoinHandle<()>) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Next event, or `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => Some(StoreEvent::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// The realtime document store the console is backed by. `write` and
/// `delete` resolve only once the store has acknowledged the change.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError>;

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: Collection, id: &str)
        -> Result<Option<serde_json::Value>, StoreError>;

    async fn write(
        &self,
        collection: Collection,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Documents whose top-level `field` equals `value`.
    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError>;
}
