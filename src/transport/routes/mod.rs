pub mod info;
pub mod playlists;
pub mod search;
pub mod sessions;
