use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    server::AppState,
    transport::{
        middleware::{add_response_headers, check_auth},
        routes::{info, playlists, search, sessions},
        websocket_server,
    },
};

const API_V1: &str = "/v1";

pub fn router(state: Arc<AppState>) -> Router {
    let v1_routes = Router::new()
        .route("/info", get(info::get_info))
        .route("/search", get(search::search))
        .route("/sessions", get(sessions::list_sessions))
        .route(
            "/sessions/{key}",
            get(sessions::get_session).delete(sessions::teardown),
        )
        .route(
            "/sessions/{key}/queue",
            get(sessions::list_pending).post(sessions::submit),
        )
        .route("/sessions/{key}/skip", post(sessions::skip))
        .route("/sessions/{key}/stop", post(sessions::stop))
        .route("/sessions/{key}/loop", post(sessions::toggle_loop))
        .route("/sessions/{key}/shuffle", post(sessions::shuffle))
        .route("/sessions/{key}/radio", post(sessions::radio))
        .route(
            "/sessions/{key}/connection-lost",
            post(sessions::connection_lost),
        )
        .route(
            "/sessions/{key}/events",
            get(websocket_server::events_handler),
        )
        .route(
            "/sessions/{key}/playlists/{name}",
            post(playlists::load_into_session),
        )
        .route(
            "/playlists",
            get(playlists::list_playlists).post(playlists::create_playlist),
        )
        .route(
            "/playlists/{name}",
            get(playlists::get_playlist).delete(playlists::delete_playlist),
        )
        .route("/playlists/{name}/tracks", post(playlists::add_track));

    Router::new()
        .nest(API_V1, v1_routes)
        .route("/version", get(info::get_version))
        .layer(middleware::from_fn_with_state(state.clone(), check_auth))
        .layer(middleware::from_fn(add_response_headers))
        .with_state(state)
}
