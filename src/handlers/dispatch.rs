//! Dispatch handlers: natural-language request in, one tool call out.
//!
//! Each cycle runs under the configured deadline. When the deadline expires
//! (or the client disconnects) the cycle's future is dropped: steps that had
//! not started never run, but a tool call already on the wire may still
//! have taken effect remotely.

use crate::dispatcher::Dispatcher;
use crate::error::{AppError, Result};
use crate::selection::Selection;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    /// The natural language request
    pub text: String,
    /// Select and validate only; never invoke the tool
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub dispatch_id: String,
    pub tool: String,
    pub arguments: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchDispatchRequest {
    pub requests: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchDispatchResponse {
    pub results: Vec<BatchItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub index: usize,
    pub dispatch_id: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Ok {
        tool: String,
        arguments: Map<String, Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lines: Option<Vec<String>>,
    },
    Error {
        kind: &'static str,
        error: String,
    },
}

/// POST /dispatch - Map a request to one tool call and run it.
///
/// # Flow
/// 1. Validate input and readiness
/// 2. Acquire a dispatch permit (503 if the service stays saturated)
/// 3. Select, validate, invoke and render against the current catalog snapshot
pub async fn dispatch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>> {
    if request.text.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Text cannot be empty".to_string(),
        ));
    }
    ensure_ready(&state)?;

    let _permit = acquire_permit(&state.semaphore).await?;

    let dispatcher = state.dispatcher().await;
    let dispatch_id = Uuid::new_v4().to_string();

    let (selection, lines) = run_cycle(
        &dispatcher,
        &dispatch_id,
        &request.text,
        request.dry_run,
        state.config.dispatch_timeout_secs,
    )
    .await?;

    Ok(Json(DispatchResponse {
        dispatch_id,
        tool: selection.name,
        arguments: selection.arguments,
        lines,
    }))
}

/// POST /dispatch/batch - Run several independent cycles concurrently.
///
/// All cycles share one catalog snapshot; each waits for its own permit
/// (503-style `resource` error after 5 s) and runs under its own deadline.
/// One failure does not affect the others.
pub async fn batch_dispatch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchDispatchRequest>,
) -> Result<Json<BatchDispatchResponse>> {
    if request.requests.is_empty() {
        return Err(AppError::ValidationError(
            "Requests list cannot be empty".to_string(),
        ));
    }
    let max_batch = state.config.max_batch_size;
    if request.requests.len() > max_batch {
        return Err(AppError::ValidationError(format!(
            "Maximum {} requests per batch",
            max_batch
        )));
    }
    ensure_ready(&state)?;

    let dispatcher = state.dispatcher().await;
    let deadline_secs = state.config.dispatch_timeout_secs;
    let dry_run = request.dry_run;

    // Dropping the set aborts every cycle still running, so a cancelled
    // batch never reaches steps that had not started.
    let mut cycles = JoinSet::new();
    for (index, text) in request.requests.into_iter().enumerate() {
        let dispatcher = dispatcher.clone();
        let semaphore = Arc::clone(&state.semaphore);
        cycles.spawn(async move {
            let dispatch_id = Uuid::new_v4().to_string();
            let result = match acquire_permit(&semaphore).await {
                Ok(_permit) => {
                    run_cycle(&dispatcher, &dispatch_id, &text, dry_run, deadline_secs).await
                }
                Err(e) => Err(e),
            };
            (index, dispatch_id, result)
        });
    }

    let mut results = Vec::with_capacity(cycles.len());
    while let Some(joined) = cycles.join_next().await {
        let (index, dispatch_id, result) = joined
            .map_err(|e| AppError::ResourceError(format!("Batch task failed: {}", e)))?;

        let outcome = match result {
            Ok((selection, lines)) => BatchOutcome::Ok {
                tool: selection.name,
                arguments: selection.arguments,
                lines,
            },
            Err(e) => BatchOutcome::Error {
                kind: e.kind(),
                error: e.to_string(),
            },
        };
        results.push(BatchItem {
            index,
            dispatch_id,
            outcome,
        });
    }
    results.sort_by_key(|item| item.index);

    metrics::counter!("dispatch_batches_total").increment(1);

    Ok(Json(BatchDispatchResponse { results }))
}

fn ensure_ready(state: &AppState) -> Result<()> {
    if state.is_ready() {
        Ok(())
    } else {
        Err(AppError::ResourceError(
            "Tool catalog not loaded yet".to_string(),
        ))
    }
}

/// Acquire semaphore with timeout (503 if service overloaded)
async fn acquire_permit(semaphore: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit> {
    tokio::time::timeout(Duration::from_secs(5), Arc::clone(semaphore).acquire_owned())
        .await
        .map_err(|_| {
            AppError::ResourceError("Service temporarily overloaded, please retry".to_string())
        })?
        .map_err(|_| AppError::ResourceError("Semaphore closed".to_string()))
}

/// One dispatch cycle under the deadline, with logging and metrics.
async fn run_cycle(
    dispatcher: &Dispatcher,
    dispatch_id: &str,
    text: &str,
    dry_run: bool,
    deadline_secs: u64,
) -> Result<(Selection, Option<Vec<String>>)> {
    let start = Instant::now();

    let cycle = async {
        if dry_run {
            dispatcher.plan(text).await.map(|selection| (selection, None))
        } else {
            dispatcher
                .dispatch(text)
                .await
                .map(|outcome| (outcome.selection, Some(outcome.lines)))
        }
    };

    let result = tokio::time::timeout(Duration::from_secs(deadline_secs), cycle).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    metrics::counter!("dispatch_requests_total").increment(1);
    metrics::histogram!("dispatch_latency_ms").record(elapsed_ms as f64);

    match result {
        Ok(Ok((selection, lines))) => {
            tracing::info!(
                dispatch_id,
                tool = %selection.name,
                dry_run,
                lines = lines.as_ref().map_or(0, Vec::len),
                catalog_fingerprint = %dispatcher.catalog().fingerprint(),
                elapsed_ms,
                "Dispatch completed"
            );
            Ok((selection, lines))
        }
        Ok(Err(e)) => {
            metrics::counter!("dispatch_failures_total", "kind" => e.kind()).increment(1);
            tracing::debug!(dispatch_id, kind = e.kind(), elapsed_ms, "Dispatch cycle aborted");
            Err(e.into())
        }
        Err(_) => {
            metrics::counter!("dispatch_failures_total", "kind" => "timeout").increment(1);
            Err(AppError::TimeoutError(deadline_secs))
        }
    }
}
