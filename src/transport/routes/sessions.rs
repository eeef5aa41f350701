use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::{
    common::{
        errors::ApiError,
        types::{RequesterId, SessionKey, TargetHint},
    },
    protocol::{QueueQuery, RadioRequest, Sessions, SubmitRequest},
    server::{AppState, SessionHandle},
};

const DEFAULT_RADIO_GENRE: &str = "lofi";

fn session_path(key: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        format!("/v1/sessions/{}", key)
    } else {
        format!("/v1/sessions/{}/{}", key, suffix)
    }
}

fn gone(key: &str, suffix: &str) -> Response {
    ApiError::internal("Session is shutting down", session_path(key, suffix)).into_response()
}

fn not_found(key: &str, suffix: &str) -> Response {
    ApiError::not_found("Session not found", session_path(key, suffix)).into_response()
}

/// Runs a fire-and-forget command against an existing session.
fn command(
    state: &AppState,
    key: String,
    suffix: &str,
    send: impl FnOnce(&SessionHandle) -> bool,
) -> Response {
    tracing::info!("POST {}", session_path(&key, suffix));
    let Some(session) = state.sessions.get(&SessionKey::from(key.as_str())) else {
        return not_found(&key, suffix);
    };
    if send(&session) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        gone(&key, suffix)
    }
}

/// GET /v1/sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Sessions> {
    tracing::debug!("GET /v1/sessions");
    Json(Sessions {
        sessions: state.sessions.keys(),
    })
}

/// GET /v1/sessions/{key}
pub async fn get_session(Path(key): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("GET {}", session_path(&key, ""));
    let Some(session) = state.sessions.get(&SessionKey::from(key.as_str())) else {
        return not_found(&key, "");
    };
    match session.status().await {
        Some(status) => Json(status).into_response(),
        None => gone(&key, ""),
    }
}

/// POST /v1/sessions/{key}/queue
pub async fn submit(
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    tracing::info!("POST {}: query='{}'", session_path(&key, "queue"), body.query);

    if body.query.trim().is_empty() {
        return ApiError::bad_request("query must not be empty", session_path(&key, "queue"))
            .into_response();
    }

    let session = state.sessions.get_or_create(&SessionKey::from(key.as_str()));
    if session.submit(
        body.query,
        RequesterId(body.requester_id),
        body.location.map(TargetHint::from),
    ) {
        StatusCode::ACCEPTED.into_response()
    } else {
        gone(&key, "queue")
    }
}

/// GET /v1/sessions/{key}/queue?limit=...
pub async fn list_pending(
    Path(key): Path<String>,
    Query(params): Query<QueueQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let limit = params
        .limit
        .unwrap_or(state.config.playback.pending_page_size);
    tracing::debug!("GET {}: limit={}", session_path(&key, "queue"), limit);

    let Some(session) = state.sessions.get(&SessionKey::from(key.as_str())) else {
        return not_found(&key, "queue");
    };
    match session.list_pending(limit).await {
        Some(pending) => Json(pending).into_response(),
        None => gone(&key, "queue"),
    }
}

/// POST /v1/sessions/{key}/skip
pub async fn skip(Path(key): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    command(&state, key, "skip", SessionHandle::skip)
}

/// POST /v1/sessions/{key}/stop
pub async fn stop(Path(key): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    command(&state, key, "stop", SessionHandle::stop)
}

/// POST /v1/sessions/{key}/loop
pub async fn toggle_loop(Path(key): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    command(&state, key, "loop", SessionHandle::toggle_loop)
}

/// POST /v1/sessions/{key}/shuffle
pub async fn shuffle(Path(key): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    command(&state, key, "shuffle", SessionHandle::shuffle)
}

/// POST /v1/sessions/{key}/connection-lost
pub async fn connection_lost(
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    command(&state, key, "connection-lost", SessionHandle::connection_lost)
}

/// POST /v1/sessions/{key}/radio
pub async fn radio(
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<RadioRequest>,
) -> Response {
    let genre = body
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or(DEFAULT_RADIO_GENRE);
    let query = format!("{} radio live", genre);
    tracing::info!("POST {}: '{}'", session_path(&key, "radio"), query);

    let session = state.sessions.get_or_create(&SessionKey::from(key.as_str()));
    if session.submit(
        query,
        RequesterId(body.requester_id),
        body.location.map(TargetHint::from),
    ) {
        StatusCode::ACCEPTED.into_response()
    } else {
        gone(&key, "radio")
    }
}

/// DELETE /v1/sessions/{key}
pub async fn teardown(Path(key): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("DELETE {}", session_path(&key, ""));
    if state.sessions.remove(&SessionKey::from(key.as_str())) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(&key, "")
    }
}
