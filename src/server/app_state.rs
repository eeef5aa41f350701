use std::sync::Arc;

use crate::{
    configs::Config,
    output::SinkConnectionManager,
    playlists::PlaylistStore,
    server::session_manager::SessionManager,
    sources::Resolver,
};

/// Top-level application state shared by every HTTP handler.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    pub resolver: Arc<dyn Resolver>,
    pub connections: Arc<SinkConnectionManager>,
    pub playlists: PlaylistStore,
    pub extractor_name: String,
    pub catalog_lookup: bool,
}
