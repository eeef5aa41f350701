use std::{net::SocketAddr, sync::Arc, time::Duration};

use queuelink::{
    common::{
        banner::{self, BannerInfo},
        http::HttpClient,
        logger,
        types::AnyResult,
    },
    configs::Config,
    output::{ProcessTransport, SinkConnectionManager},
    player::Collaborators,
    playlists::PlaylistStore,
    server::{AppState, SessionManager},
    sources::{
        DownloadCache, MediaExtractor, MetadataLookup, Resolver, TrackResolver,
        spotify::SpotifyCatalog, ytdlp::YtDlpExtractor,
    },
    transport,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(&config);

    let extractor: Arc<dyn MediaExtractor> = Arc::new(YtDlpExtractor::new(&config.resolver));
    let extractor_name = extractor.name().to_string();
    banner::print_banner(&BannerInfo::default(), &extractor_name, &config.output.program);
    let cache = DownloadCache::new(&config.resolver.cache_dir)?;
    let resolver: Arc<dyn Resolver> = Arc::new(TrackResolver::new(
        extractor,
        cache,
        config.resolver.search_limit,
    ));

    let http = HttpClient::with_timeout(Duration::from_secs(15))?;
    let metadata: Option<Arc<dyn MetadataLookup>> = match SpotifyCatalog::new(&config.spotify, http)
    {
        Some(catalog) => Some(Arc::new(catalog)),
        None => {
            warn!("Spotify credentials not configured; catalog links will not expand");
            None
        }
    };
    let catalog_lookup = metadata.is_some();

    let connections = Arc::new(SinkConnectionManager::new(&config.output));
    let services = Collaborators {
        resolver: resolver.clone(),
        transport: Arc::new(ProcessTransport::new(&config.output)),
        connections: connections.clone(),
        metadata,
    };

    let state = Arc::new(AppState {
        sessions: SessionManager::new(services, config.playback.clone()),
        resolver,
        connections,
        playlists: PlaylistStore::new(&config.playlists.dir)?,
        extractor_name,
        catalog_lookup,
        config: config.clone(),
    });

    let app = transport::http_server::router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let ip: std::net::IpAddr = config.server.host.parse()?;
    let address = SocketAddr::from((ip, config.server.port));
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down {} sessions", state.sessions.len());
    state.sessions.shutdown();
    // Give sessions a moment to release their outputs.
    tokio::time::sleep(Duration::from_millis(250)).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
