pub mod common;
pub mod configs;
pub mod output;
pub mod player;
pub mod playlists;
pub mod protocol;
pub mod server;
pub mod sources;
pub mod transport;
