use std::sync::Arc;

use axum::{extract::State, response::Json};

use crate::{
    protocol::{GitInfo, Info, Version},
    server::AppState,
};

/// GET /v1/info
pub async fn get_info(State(state): State<Arc<AppState>>) -> Json<Info> {
    tracing::debug!("GET /v1/info");
    Json(Info {
        version: Version::parse(env!("CARGO_PKG_VERSION")),
        build_time: option_env!("BUILD_TIME")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        git: GitInfo::current(),
        extractor: state.extractor_name.clone(),
        catalog_lookup: state.catalog_lookup,
        sessions: state.sessions.len(),
        active_outputs: state.connections.active_count(),
    })
}

/// GET /version
pub async fn get_version() -> String {
    tracing::debug!("GET /version");
    env!("CARGO_PKG_VERSION").to_string()
}
