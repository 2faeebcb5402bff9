use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::models::booking::carry_legacy_key;
use crate::models::{BookingRecord, BookingStatus, HistoryRecord, PriceList, ReportPeriod};
use crate::services::reports::{compute_aggregates, Aggregates};
use crate::services::store::{
    Collection, Document, RecordStore, StoreError, StoreEvent, Subscription,
};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("booking {id} not found in {collection}")]
    NotFound { id: String, collection: Collection },

    #[error("a transition for booking {0} is already in progress")]
    TransitionInProgress(String),

    #[error(transparent)]
    Transport(#[from] StoreError),

    #[error("booking {id} was written to {written} but is still present in {remaining}: {error}")]
    PartialFailure {
        id: String,
        written: Collection,
        remaining: Collection,
        error: StoreError,
    },
}

/// Cached contents of both collections as last delivered by the store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub active: Vec<BookingRecord>,
    pub history: Vec<HistoryRecord>,
}

impl Snapshot {
    /// Ids present in both sets, left behind by a move whose delete failed.
    pub fn duplicates(&self) -> Vec<String> {
        let active: HashSet<&str> = self.active.iter().map(|r| r.id.as_str()).collect();
        let mut ids: Vec<String> = self
            .history
            .iter()
            .filter(|r| active.contains(r.id()))
            .map(|r| r.id().to_string())
            .collect();
        ids.sort();
        ids
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeNotice {
    Updated { collection: Collection, count: usize },
    StoreError { collection: Collection, message: String },
}

/// Owns the one live view of `bookings` and `history` and moves records
/// between them.
pub struct BookingLifecycle {
    store: Arc<dyn RecordStore>,
    cache: RwLock<Snapshot>,
    in_flight: Mutex<HashSet<String>>,
    changes: broadcast::Sender<ChangeNotice>,
}

/// Holds the per-booking in-flight marker until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

impl BookingLifecycle {
    /// Subscribes to both collections, seeds the cache from the initial
    /// snapshots and keeps it current in background tasks.
    pub async fn start(store: Arc<dyn RecordStore>) -> Result<Arc<Self>, StoreError> {
        let mut bookings = store.subscribe(Collection::Bookings).await?;
        let mut history = store.subscribe(Collection::History).await?;

        let (changes, _) = broadcast::channel(64);
        let lifecycle = Arc::new(Self {
            store,
            cache: RwLock::new(Snapshot::default()),
            in_flight: Mutex::new(HashSet::new()),
            changes,
        });

        lifecycle.replace(Collection::Bookings, std::mem::take(&mut bookings.initial));
        lifecycle.replace(Collection::History, std::mem::take(&mut history.initial));

        tokio::spawn(watch(
            Arc::downgrade(&lifecycle),
            Collection::Bookings,
            bookings,
        ));
        tokio::spawn(watch(Arc::downgrade(&lifecycle), Collection::History, history));

        Ok(lifecycle)
    }

    // ── Transitions ──

    /// Moves an active booking into history as confirmed or canceled. The
    /// history write is acknowledged before the active copy is deleted.
    pub async fn transition(
        &self,
        id: &str,
        target: BookingStatus,
    ) -> Result<HistoryRecord, LifecycleError> {
        validate_id(id)?;
        if !target.is_terminal() {
            return Err(LifecycleError::Validation(format!(
                "cannot transition a booking to {}",
                target.as_str()
            )));
        }
        let _guard = self.claim(id)?;

        let body = self
            .store
            .get(Collection::Bookings, id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound {
                id: id.to_string(),
                collection: Collection::Bookings,
            })?;
        let booking = BookingRecord::from_document(id, body.clone()).map_err(|e| {
            LifecycleError::Validation(format!("booking {id} is malformed: {e}"))
        })?;

        let now = Utc::now();
        let history_body = merge_fields(
            carry_legacy_key(body, "timestamp", "created_at"),
            &["status", "action_timestamp", "timestamp"],
            [
                ("status", Value::from(target.as_str())),
                ("action_timestamp", Value::from(now.timestamp_millis())),
            ],
        );
        let record = HistoryRecord::finalize(booking, target, now);

        if let Err(e) = self.store.write(Collection::History, id, &history_body).await {
            tracing::error!(error = %e, id, status = target.as_str(), "failed to write booking to history");
            return Err(e.into());
        }

        if let Err(e) = self.store.delete(Collection::Bookings, id).await {
            tracing::error!(
                error = %e,
                id,
                "booking written to history but not removed from bookings"
            );
            self.apply(|snapshot| upsert_history(snapshot, record.clone()));
            return Err(LifecycleError::PartialFailure {
                id: id.to_string(),
                written: Collection::History,
                remaining: Collection::Bookings,
                error: e,
            });
        }

        self.apply(|snapshot| {
            snapshot.active.retain(|r| r.id != id);
            upsert_history(snapshot, record.clone());
        });
        tracing::info!(id, status = target.as_str(), "booking moved to history");
        Ok(record)
    }

    /// Puts a finalized booking back into the active set with its status
    /// cleared and a fresh creation time.
    pub async fn restore(&self, id: &str) -> Result<BookingRecord, LifecycleError> {
        validate_id(id)?;
        let _guard = self.claim(id)?;

        let body = self
            .store
            .get(Collection::History, id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound {
                id: id.to_string(),
                collection: Collection::History,
            })?;
        let history = HistoryRecord::from_document(id, body.clone()).map_err(|e| {
            LifecycleError::Validation(format!("history record {id} is malformed: {e}"))
        })?;

        let now = Utc::now();
        let active_body = merge_fields(
            body,
            &["status", "action_timestamp", "timestamp"],
            [("created_at", Value::from(now.timestamp_millis()))],
        );
        let record = history.into_active(now);

        if let Err(e) = self.store.write(Collection::Bookings, id, &active_body).await {
            tracing::error!(error = %e, id, "failed to write booking back to bookings");
            return Err(e.into());
        }

        if let Err(e) = self.store.delete(Collection::History, id).await {
            tracing::error!(
                error = %e,
                id,
                "booking restored but not removed from history"
            );
            self.apply(|snapshot| upsert_active(snapshot, record.clone()));
            return Err(LifecycleError::PartialFailure {
                id: id.to_string(),
                written: Collection::Bookings,
                remaining: Collection::History,
                error: e,
            });
        }

        self.apply(|snapshot| {
            snapshot.history.retain(|r| r.id() != id);
            upsert_active(snapshot, record.clone());
        });
        tracing::info!(id, "booking restored to active");
        Ok(record)
    }

    /// Irreversible removal from one collection. Nothing is copied anywhere.
    pub async fn permanently_delete(
        &self,
        id: &str,
        from: Collection,
    ) -> Result<(), LifecycleError> {
        validate_id(id)?;
        let _guard = self.claim(id)?;

        self.store.delete(from, id).await.map_err(|e| {
            tracing::error!(error = %e, id, collection = %from, "failed to delete booking");
            LifecycleError::from(e)
        })?;

        self.apply(|snapshot| match from {
            Collection::Bookings => snapshot.active.retain(|r| r.id != id),
            Collection::History => snapshot.history.retain(|r| r.id() != id),
        });
        tracing::info!(id, collection = %from, "booking permanently deleted");
        Ok(())
    }

    // ── Reads ──

    /// Active bookings ordered by event date, then start time.
    pub fn active(&self) -> Vec<BookingRecord> {
        let mut records = self.read().active.clone();
        records.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.time.range().map(|r| r.start).cmp(&b.time.range().map(|r| r.start)))
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    /// History ordered by action time, most recent first.
    pub fn history(&self) -> Vec<HistoryRecord> {
        let mut records = self.read().history.clone();
        records.sort_by(|a, b| {
            b.action_timestamp
                .cmp(&a.action_timestamp)
                .then_with(|| a.id().cmp(b.id()))
        });
        records
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read().clone()
    }

    pub fn find_active(&self, id: &str) -> Option<BookingRecord> {
        self.read().active.iter().find(|r| r.id == id).cloned()
    }

    pub fn find_history(&self, id: &str) -> Option<HistoryRecord> {
        self.read().history.iter().find(|r| r.id() == id).cloned()
    }

    pub fn duplicates(&self) -> Vec<String> {
        self.read().duplicates()
    }

    pub fn aggregates(&self, period: ReportPeriod, prices: &PriceList) -> Aggregates {
        let snapshot = self.read();
        compute_aggregates(&snapshot.active, &snapshot.history, period, prices)
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }

    /// Active bookings whose `field` equals `value`, straight from the store.
    pub async fn query_active(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<BookingRecord>, LifecycleError> {
        let documents = self.store.query(Collection::Bookings, field, value).await?;
        Ok(decode_all(&documents, BookingRecord::from_document))
    }

    /// History records whose `field` equals `value`, straight from the store.
    pub async fn query_history(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<HistoryRecord>, LifecycleError> {
        let documents = self.store.query(Collection::History, field, value).await?;
        Ok(decode_all(&documents, HistoryRecord::from_document))
    }

    // ── Internals ──

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn claim(&self, id: &str) -> Result<InFlightGuard<'_>, LifecycleError> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id.to_string()) {
            tracing::warn!(id, "rejected concurrent transition");
            return Err(LifecycleError::TransitionInProgress(id.to_string()));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            id: id.to_string(),
        })
    }

    fn apply(&self, change: impl FnOnce(&mut Snapshot)) {
        let (active, history) = {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            change(&mut *cache);
            (cache.active.len(), cache.history.len())
        };
        self.notify(ChangeNotice::Updated {
            collection: Collection::Bookings,
            count: active,
        });
        self.notify(ChangeNotice::Updated {
            collection: Collection::History,
            count: history,
        });
    }

    /// Replaces one collection of the cache wholesale.
    fn replace(&self, collection: Collection, documents: Vec<Document>) {
        let (count, duplicates) = {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            let count = match collection {
                Collection::Bookings => {
                    cache.active = decode_all(&documents, BookingRecord::from_document);
                    cache.active.len()
                }
                Collection::History => {
                    cache.history = decode_all(&documents, HistoryRecord::from_document);
                    cache.history.len()
                }
            };
            (count, cache.duplicates())
        };

        if !duplicates.is_empty() {
            tracing::warn!(
                ids = ?duplicates,
                "bookings present in both bookings and history"
            );
        }
        tracing::debug!(collection = %collection, count, "cache refreshed");
        self.notify(ChangeNotice::Updated { collection, count });
    }

    fn notify(&self, notice: ChangeNotice) {
        // No listeners is fine.
        let _ = self.changes.send(notice);
    }
}

async fn watch(lifecycle: Weak<BookingLifecycle>, collection: Collection, mut subscription: Subscription) {
    while let Some(event) = subscription.next().await {
        let Some(this) = lifecycle.upgrade() else {
            break;
        };

        match event {
            StoreEvent::Snapshot(documents) => this.replace(collection, documents),
            StoreEvent::Lagged(missed) => {
                tracing::warn!(collection = %collection, missed, "subscription lagged, re-reading collection");
                match this.store.list(collection).await {
                    Ok(documents) => this.replace(collection, documents),
                    Err(e) => {
                        tracing::error!(error = %e, collection = %collection, "failed to re-read collection");
                        this.notify(ChangeNotice::StoreError {
                            collection,
                            message: e.to_string(),
                        });
                    }
                }
            }
            StoreEvent::Error(message) => {
                tracing::error!(collection = %collection, error = %message, "subscription error");
                this.notify(ChangeNotice::StoreError {
                    collection,
                    message,
                });
            }
        }
    }
    tracing::debug!(collection = %collection, "subscription closed");
}

fn decode_all<T>(
    documents: &[Document],
    decode: impl Fn(&str, Value) -> Result<T, serde_json::Error>,
) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match decode(&doc.id, doc.body.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}

/// Realtime database keys cannot be empty or contain `. # $ [ ] /`.
fn validate_id(id: &str) -> Result<(), LifecycleError> {
    if id.trim().is_empty() {
        return Err(LifecycleError::Validation("booking id is required".to_string()));
    }
    if id.contains(['.', '#', '$', '[', ']', '/']) {
        return Err(LifecycleError::Validation(format!("invalid booking id: {id}")));
    }
    Ok(())
}

/// Copies a stored body, dropping `remove` keys and setting `set` keys.
/// Fields this service does not model are carried over untouched.
fn merge_fields<const N: usize>(
    body: Value,
    remove: &[&str],
    set: [(&str, Value); N],
) -> Value {
    let mut map = match body {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    for key in remove {
        map.remove(*key);
    }
    for (key, value) in set {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

fn upsert_history(snapshot: &mut Snapshot, record: HistoryRecord) {
    snapshot.history.retain(|r| r.id() != record.id());
    snapshot.history.push(record);
}

fn upsert_active(snapshot: &mut Snapshot, record: BookingRecord) {
    snapshot.active.retain(|r| r.id != record.id);
    snapshot.active.push(record);
}
