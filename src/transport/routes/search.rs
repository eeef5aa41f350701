use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};

use crate::{
    common::errors::{ApiError, ResolutionError},
    protocol::SearchQuery,
    server::AppState,
};

/// GET /v1/search?query=...
pub async fn search(
    Query(params): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let query = params.query.trim();
    tracing::info!("GET /v1/search: query='{}'", query);

    if query.is_empty() {
        return ApiError::bad_request("query must not be empty", "/v1/search").into_response();
    }

    match state.resolver.search(query).await {
        Ok(results) => Json(results).into_response(),
        Err(ResolutionError::NotFound(msg)) => {
            ApiError::not_found(msg, "/v1/search").into_response()
        }
        Err(e) => ApiError::bad_gateway(e.to_string(), "/v1/search").into_response(),
    }
}
