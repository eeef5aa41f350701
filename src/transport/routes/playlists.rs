use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::{
    common::{
        errors::ApiError,
        types::{RequesterId, SessionKey, TargetHint},
    },
    playlists::PlaylistError,
    protocol::{AddTrackRequest, CreatePlaylistRequest, LoadPlaylistRequest, Playlist, PlaylistAdded},
    server::AppState,
};

fn error_response(err: PlaylistError, path: String) -> Response {
    let api = match &err {
        PlaylistError::InvalidName(_) => ApiError::bad_request(err.to_string(), path),
        PlaylistError::NotFound(_) => ApiError::not_found(err.to_string(), path),
        PlaylistError::AlreadyExists(_) => ApiError::conflict(err.to_string(), path),
        PlaylistError::Corrupt { .. } | PlaylistError::Io(_) => {
            tracing::error!("Playlist storage error: {}", err);
            ApiError::internal(err.to_string(), path)
        }
    };
    api.into_response()
}

/// GET /v1/playlists
pub async fn list_playlists(State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("GET /v1/playlists");
    match state.playlists.list().await {
        Ok(names) => Json(names).into_response(),
        Err(e) => error_response(e, "/v1/playlists".into()),
    }
}

/// POST /v1/playlists
pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePlaylistRequest>,
) -> Response {
    tracing::info!("POST /v1/playlists: name='{}'", body.name);
    match state.playlists.create(&body.name).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(Playlist {
                name: body.name,
                tracks: Vec::new(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e, "/v1/playlists".into()),
    }
}

/// GET /v1/playlists/{name}
pub async fn get_playlist(Path(name): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("GET /v1/playlists/{}", name);
    match state.playlists.load(&name).await {
        Ok(tracks) => Json(Playlist { name, tracks }).into_response(),
        Err(e) => error_response(e, format!("/v1/playlists/{}", name)),
    }
}

/// DELETE /v1/playlists/{name}
pub async fn delete_playlist(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    tracing::info!("DELETE /v1/playlists/{}", name);
    match state.playlists.delete(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e, format!("/v1/playlists/{}", name)),
    }
}

/// POST /v1/playlists/{name}/tracks
pub async fn add_track(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddTrackRequest>,
) -> Response {
    let path = format!("/v1/playlists/{}/tracks", name);
    tracing::info!("POST {}: query='{}'", path, body.query);

    if body.query.trim().is_empty() {
        return ApiError::bad_request("query must not be empty", path).into_response();
    }
    match state.playlists.add(&name, &body.query).await {
        Ok(length) => Json(PlaylistAdded { name, length }).into_response(),
        Err(e) => error_response(e, path),
    }
}

/// POST /v1/sessions/{key}/playlists/{name}
pub async fn load_into_session(
    Path((key, name)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoadPlaylistRequest>,
) -> Response {
    let path = format!("/v1/sessions/{}/playlists/{}", key, name);
    tracing::info!("POST {}", path);

    let tracks = match state.playlists.load(&name).await {
        Ok(tracks) => tracks,
        Err(e) => return error_response(e, path),
    };
    if tracks.is_empty() {
        return ApiError::bad_request(format!("playlist '{}' is empty", name), path)
            .into_response();
    }

    let session = state.sessions.get_or_create(&SessionKey::from(key.as_str()));
    if session.submit_batch(
        format!("playlist:{}", name),
        tracks,
        RequesterId(body.requester_id),
        body.location.map(TargetHint::from),
    ) {
        StatusCode::ACCEPTED.into_response()
    } else {
        ApiError::internal("Session is shutting down", path).into_response()
    }
}
