//! Track library for Tinamp - decoding, file info, playlists and config

mod config;
mod file_info;
mod loader;
pub mod playlist;

pub use config::Config;
pub use file_info::{file_info, FileInfo, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
pub use loader::{
    is_supported, Decode, LoadError, LoadedTrack, TrackLoader, TrackMetadata,
    SUPPORTED_EXTENSIONS,
};
pub use playlist::{PlaylistEntry, PlaylistError};
