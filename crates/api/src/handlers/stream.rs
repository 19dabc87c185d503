//! Live output streaming over Server-Sent Events.
//!
//! `GET /api/runs/{id}/stream` replays everything the run has printed so
//! far, then tails new lines as they arrive. Each line is one unnamed SSE
//! `data:` event; the terminal status arrives as a final `done` event, after
//! which the stream closes. Runs that already left the live registry are
//! replayed from their persisted output instead.
//!
//! This route is mounted outside the request timeout: a stream legitimately
//! stays open for as long as the script runs.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use runforge_core::error::CoreError;
use runforge_core::status::RunStatus;
use runforge_core::types::DbId;
use runforge_db::models::Run;
use runforge_db::repositories::RunRepo;
use runforge_live::{LiveRunRegistry, RunSubscription};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Buffered events between the relay task and the HTTP response body.
const EVENT_BUFFER: usize = 64;

/// GET /api/runs/{id}/stream
///
/// Authentication accepts `?token=` in place of the `Authorization` header
/// because `EventSource` cannot set headers.
pub async fn stream_run(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(run_id): Path<DbId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let (events, rx) = mpsc::channel::<Event>(EVENT_BUFFER);

    match state.registry.subscribe(run_id).await {
        Some(subscription) => {
            let registry = Arc::clone(&state.registry);
            let pool = state.pool.clone();
            tokio::spawn(relay_live(registry, pool, run_id, subscription, events));
        }
        None => {
            // Not live any more (or never was): replay the stored record.
            let run = RunRepo::find_by_id(&state.pool, run_id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "Run",
                    id: run_id,
                }))?;
            tokio::spawn(replay_finished(run, events));
        }
    }

    let stream = ReceiverStream::new(rx).map(Ok::<Event, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Feed a live subscription into the response channel: history first, then
/// the tail, then the `done` event. A send failure means the client hung
/// up, in which case the subscription is dropped from the registry.
async fn relay_live(
    registry: Arc<LiveRunRegistry>,
    pool: runforge_db::DbPool,
    run_id: DbId,
    mut subscription: RunSubscription,
    events: mpsc::Sender<Event>,
) {
    for line in &subscription.history {
        if events.send(Event::default().data(line)).await.is_err() {
            registry.unsubscribe(run_id, subscription.token).await;
            return;
        }
    }

    while let Some(line) = subscription.receiver.recv().await {
        if events.send(Event::default().data(line)).await.is_err() {
            registry.unsubscribe(run_id, subscription.token).await;
            return;
        }
    }

    // Tail closed: the run finished, or its entry was swept mid-stream.
    let status = final_status(&registry, &pool, run_id, subscription.status).await;
    let _ = events.send(Event::default().event("done").data(status)).await;
}

/// Replay a persisted run: its stored output line by line, then `done`.
async fn replay_finished(run: Run, events: mpsc::Sender<Event>) {
    for line in run.output.lines() {
        if events.send(Event::default().data(line)).await.is_err() {
            return;
        }
    }
    let status = run.status().unwrap_or(RunStatus::Failed);
    let _ = events
        .send(Event::default().event("done").data(status.to_string()))
        .await;
}

/// The status to report in the `done` event. Prefers what the subscription
/// saw, then the registry, then the stored record.
async fn final_status(
    registry: &LiveRunRegistry,
    pool: &runforge_db::DbPool,
    run_id: DbId,
    at_subscribe: Option<RunStatus>,
) -> String {
    if let Some(status) = at_subscribe {
        return status.to_string();
    }
    if let Some(status) = registry.status(run_id).await {
        return status.to_string();
    }
    match RunRepo::find_by_id(pool, run_id).await {
        Ok(Some(run)) => run.status().unwrap_or(RunStatus::Failed).to_string(),
        _ => RunStatus::Failed.to_string(),
    }
}
