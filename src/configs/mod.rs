pub mod base;
pub mod logging;
pub mod output;
pub mod playback;
pub mod playlists;
pub mod resolver;
pub mod server;
pub mod spotify;

pub use base::*;
pub use logging::*;
pub use output::*;
pub use playback::*;
pub use playlists::*;
pub use resolver::*;
pub use server::*;
pub use spotify::*;
