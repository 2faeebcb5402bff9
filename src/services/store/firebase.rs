use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use super::{Collection, Document, RecordStore, StoreError, StoreEvent, Subscription};

/// Firebase Realtime Database over its REST API. Subscriptions poll the
/// collection and emit a snapshot only when its contents change.
pub struct FirebaseRecordStore {
    inner: Arc<FirebaseClient>,
    poll_interval: Duration,
}

struct FirebaseClient {
    client: reqwest::Client,
    database_url: String,
    secret: String,
}

impl FirebaseRecordStore {
    pub fn new(database_url: String, secret: String, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(FirebaseClient {
                client: reqwest::Client::new(),
                database_url: database_url.trim_end_matches('/').to_string(),
                secret,
            }),
            poll_interval,
        }
    }
}

impl FirebaseClient {
    fn url(&self, path: &str) -> String {
        format!("{}/{path}.json", self.database_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        if self.secret.is_empty() {
            builder
        } else {
            builder.query(&[("auth", self.secret.as_str())])
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<serde_json::Value, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!(
                "realtime database returned {status}: {body}"
            )));
        }
        Ok(response.json().await?)
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let value = self
            .send(self.request(reqwest::Method::GET, collection.as_str()))
            .await?;
        Ok(documents_from_value(value))
    }
}

/// A collection read returns `null` when empty, otherwise an object keyed
/// by document id.
fn documents_from_value(value: serde_json::Value) -> Vec<Document> {
    match value {
        serde_json::Value::Object(map) => {
            let mut documents: Vec<Document> = map
                .into_iter()
                .map(|(id, body)| Document { id, body })
                .collect();
            documents.sort_by(|a, b| a.id.cmp(&b.id));
            documents
        }
        _ => Vec::new(),
    }
}

#[async_trait]
impl RecordStore for FirebaseRecordStore {
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError> {
        let initial = self.inner.list(collection).await?;
        let (tx, rx) = broadcast::channel(16);

        let inner = Arc::clone(&self.inner);
        let interval = self.poll_interval;
        let mut last = initial.clone();

        let poller = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and the initial read is done.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let event = match inner.list(collection).await {
                    Ok(documents) if documents == last => continue,
                    Ok(documents) => {
                        last = documents.clone();
                        StoreEvent::Snapshot(documents)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, collection = %collection, "realtime database poll failed");
                        StoreEvent::Error(e.to_string())
                    }
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        tracing::info!(collection = %collection, interval_secs = interval.as_secs(), "subscribed to realtime database");
        Ok(Subscription::new(initial, rx).with_poller(poller))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        self.inner.list(collection).await
    }

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let path = format!("{collection}/{id}");
        let value = self
            .inner
            .send(self.inner.request(reqwest::Method::GET, &path))
            .await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn write(
        &self,
        collection: Collection,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let path = format!("{collection}/{id}");
        self.inner
            .send(self.inner.request(reqwest::Method::PUT, &path).json(body))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let path = format!("{collection}/{id}");
        self.inner
            .send(self.inner.request(reqwest::Method::DELETE, &path))
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        // Both parameters must be JSON-encoded strings.
        let order_by = serde_json::to_string(field)?;
        let equal_to = serde_json::to_string(value)?;
        let builder = self
            .inner
            .request(reqwest::Method::GET, collection.as_str())
            .query(&[("orderBy", order_by), ("equalTo", equal_to)]);
        let value = self.inner.send(builder).await?;
        Ok(documents_from_value(value))
    }
}
