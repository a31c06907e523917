//! Request handlers: submission, health, stats.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use drossel_core::{FailureKind, PayloadCodec, Priority, Task, TaskError};

use crate::SharedState;

/// Optional submission knobs carried as query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// `low` | `normal` | `high`.
    pub priority: Option<String>,
    /// Deadline in milliseconds, measured from submission.
    pub deadline_ms: Option<u64>,
}

/// Error body rendered for every failure outcome.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: FailureKind,
}

/// POST /tasks/{kind} — build a task from the request, submit it, answer
/// with the single completion outcome.
pub async fn submit_task(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    Query(params): Query<SubmitParams>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let mut task = Task::new(kind, payload);

    if let Some(priority) = &params.priority {
        task = match parse_priority(priority) {
            Some(p) => task.with_priority(p),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("unknown priority: {priority}") })),
                )
                    .into_response();
            }
        };
    }
    if let Some(ms) = params.deadline_ms {
        task = task.with_deadline(Duration::from_millis(ms));
    }

    let handle = match state.queue.submit(task) {
        Ok(handle) => handle,
        Err(err) => return failure_response(&err),
    };

    match handle.wait().await {
        Ok(output) => match state.codec.encode(&output.value) {
            Ok(bytes) => {
                let duration_ms = output.duration.as_millis().to_string();
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE.as_str(), state.codec.content_type()),
                        ("x-task-duration-ms", duration_ms.as_str()),
                    ],
                    bytes,
                )
                    .into_response()
            }
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("response encode failed: {e}") })),
            )
                .into_response(),
        },
        Err(err) => failure_response(&err),
    }
}

/// GET /health — liveness probe for the supervisor.
pub async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "strategy": state.queue.strategy_name(),
    }))
}

/// GET /stats — queue counters and uptime.
pub async fn stats(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let stats = state.queue.stats();
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();
    Json(json!({
        "strategy": state.queue.strategy_name(),
        "codec": state.codec.name(),
        "uptime_secs": uptime,
        "queue": stats,
    }))
}

fn parse_priority(value: &str) -> Option<Priority> {
    match value {
        "low" => Some(Priority::Low),
        "normal" => Some(Priority::Normal),
        "high" => Some(Priority::High),
        _ => None,
    }
}

/// Map each terminal failure onto its HTTP rendering. Saturation and
/// drain-time cancellation read as "try elsewhere/later"; compute failures
/// blame the request; crashes and timeouts blame the execution.
fn failure_response(err: &TaskError) -> Response {
    let status = match err {
        TaskError::QueueSaturated { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TaskError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        TaskError::Compute { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TaskError::WorkerCrashed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        TaskError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    };
    let body = ErrorBody {
        error: err.to_string(),
        kind: FailureKind::from(err),
    };
    (status, Json(body)).into_response()
}
