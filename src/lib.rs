//! Supervised playback of media files through an external player process.
//!
//! Architecture:
//! - `process.rs` - child process spawning and line-oriented output reading
//! - `protocol.rs` - control key bytes and output line patterns of the player binary
//! - `metadata.rs` - startup metadata extraction (stream counts, video/audio properties)
//! - `player.rs` - playback supervisor with a background status loop
//! - `playlist.rs` - ordered/looping playlist driving one supervisor at a time
//! - `tools.rs` - one-shot encode and overlay helper processes
//! - `config.rs` - command templates and timing configuration

mod config;
mod metadata;
mod player;
mod playlist;
mod process;
mod protocol;
mod tools;

pub use config::PlayerConfig;
pub use metadata::{read_metadata, Metadata};
pub use player::{Player, PlayerEvent, PlayerOptions};
pub use playlist::{CacheError, LocalCache, MediaCache, MediaItem, PlayError, PlaylistController};
pub use process::{find_player, LineRead, OutputLines, ProcessError, ProcessHandle};
pub use protocol::{AudioProperties, ControlKey, StreamCounts, VideoProperties};
pub use tools::{Encoder, PhotoOverlay};
