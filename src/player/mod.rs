//! Player control module for playctl
//!
//! This module turns playback requests from any thread into an ordered
//! stream of commands applied by a single consumer context. It owns the
//! revertible state/media-status stacks, the committed snapshot that
//! getters read, and the event fan-out to the render context.

mod builder;
mod command;
mod consumer;
mod controller;
mod events;
mod queue;
mod state;

pub use builder::PlayerControlBuilder;
pub use command::{Command, CommandKind, QueuedCommand};
pub use consumer::{ConsumerMessage, DrainStats};
pub use controller::{PlayerControl, MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE};
pub use events::{CallbackHandler, ChannelEventHandler};
pub use queue::CommandQueue;
pub use state::{PlaybackStacks, PlayerSnapshot, StateStack, TimeRange};

use crate::decoder::MediaContent;
use crate::renderer::TextureHandle;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Logical playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// Nothing decoding; also the baseline the state stack rests on
    #[default]
    Stopped,

    /// Currently playing
    Playing,

    /// Playback paused
    Paused,
}

/// Readiness of the current media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaStatus {
    /// No media set
    #[default]
    NoMedia,

    /// Media accepted, processor still opening it
    Loading,

    /// Media ready to play and (if supported) seek
    Loaded,

    /// Buffer underrun reported by the processor
    Buffering,

    /// Playback ran off the end of the media
    EndOfMedia,

    /// Media could not be opened, or the pipeline failed
    InvalidMedia,
}

impl MediaStatus {
    /// Statuses in which the processor can act on a seek
    pub fn accepts_seek(self) -> bool {
        matches!(
            self,
            MediaStatus::Loaded | MediaStatus::Buffering | MediaStatus::EndOfMedia
        )
    }

    /// Statuses with media the processor has accepted
    pub fn has_media(self) -> bool {
        !matches!(self, MediaStatus::NoMedia | MediaStatus::InvalidMedia)
    }
}

/// Player event for external event handling
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlayerState),
    MediaStatusChanged(MediaStatus),
    PositionChanged(Duration),
    DurationChanged(Duration),
    BufferStatusChanged(u8),
    SeekableChanged(bool),
    AvailabilityChanged { audio: bool, video: bool },
    VolumeChanged(f32),
    MutedChanged(bool),
    PlaybackRateChanged(f32),
    MediaChanged(MediaContent),

    /// A new frame is in this texture; the render context may read it
    TextureReady(TextureHandle),

    /// The render context must stop reading this texture
    TextureInvalidated(TextureHandle),

    /// A command or the pipeline failed; state already reflects it
    Error { message: String },
}

/// Player event handler trait
///
/// Handlers run on whichever context produced the event (usually the
/// consumer context). Subscribing and queued mutators are fine from inside a
/// handler. The volume, mute and rate setters are not: they dispatch back
/// into the handler that is still running.
pub trait PlayerEventHandler: Send {
    /// Handle player event
    fn handle_event(&mut self, event: PlayerEvent);
}
