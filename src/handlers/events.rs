use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use super::check_token;
use crate::errors::AppError;
use crate::state::AppState;

// GET /api/events (SSE stream of cache change notices)
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource can't set headers
    check_token(query.token.as_deref().unwrap_or(""), &state.sessions)?;

    let rx = state.lifecycle.subscribe_changes();

    let live_stream = BroadcastStream::new(rx).map(|result| match result {
        Ok(notice) => {
            let data = serde_json::to_string(&notice).unwrap_or_default();
            Ok::<_, Infallible>(Event::default().data(data).event("change"))
        }
        // The client should refetch everything.
        Err(BroadcastStreamRecvError::Lagged(missed)) => Ok(Event::default()
            .data(serde_json::json!({ "missed": missed }).to_string())
            .event("resync")),
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    Ok(Sse::new(live_stream.merge(keepalive_stream)))
}
