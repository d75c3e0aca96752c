//! playctl - non-blocking playback control for asynchronous video decoders
//!
//! Requests from any thread are appended to a command queue and applied in
//! order by a single consumer context, which is either a dedicated worker
//! thread or the render loop. Decoded frames reach the renderer through a
//! single-slot texture hand-off.

pub mod decoder;
pub mod player;
pub mod renderer;
pub mod utils;

pub use decoder::{LoadId, MediaContent, MediaProcessor, Notification, NotificationSink};
pub use player::{
    MediaStatus, PlayerControl, PlayerControlBuilder, PlayerEvent, PlayerEventHandler, PlayerState,
};
pub use renderer::{FrameSize, TextureData, TextureHandle, TextureProvider};
pub use utils::error::{PlayerError, Result};
