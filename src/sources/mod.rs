pub mod cache;
pub mod manager;
pub mod plugin;
pub mod spotify;
pub mod ytdlp;

pub use cache::DownloadCache;
pub use manager::TrackResolver;
pub use plugin::{MediaExtractor, MediaInfo, MetadataLookup, Resolver};
