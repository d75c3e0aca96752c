//! Decoder module for playctl
//!
//! The decode pipeline itself lives behind the [`MediaProcessor`] trait.
//! Calls into it are synchronous from the consumer's point of view; the
//! actual decoding runs on the processor's own threads and reports back
//! through a [`NotificationSink`].

mod simulated;

pub use simulated::{ProcessorOp, SimulatedConfig, SimulatedHandle, SimulatedProcessor};

use crate::player::ConsumerMessage;
use crate::renderer::FrameSize;
use crate::utils::error::Result;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Media processor trait: the asynchronous decode pipeline
pub trait MediaProcessor: Send {
    /// Hand the processor the channel it reports notifications through.
    /// Called once, before any other method.
    fn bind(&mut self, sink: NotificationSink);

    /// Open a media resource
    ///
    /// `load` identifies this call and must be echoed in the `MediaReady`
    /// reported for the media.
    ///
    /// # Returns
    ///
    /// `PlayerError::InvalidMedia` if the resource cannot be resolved
    fn set_media(&mut self, media: &MediaContent, load: LoadId) -> Result<()>;

    /// Start or resume decoding into surfaces of `frame_size`
    fn play(&mut self, frame_size: FrameSize) -> Result<()>;

    /// Pause decoding, keeping the position
    fn pause(&mut self) -> Result<()>;

    /// Stop decoding and rewind
    fn stop(&mut self) -> Result<()>;

    /// Seek to a specific position
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Set volume (0.0 to 1.0)
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Mute/unmute audio
    fn set_muted(&mut self, muted: bool) -> Result<()>;

    /// Set playback speed multiplier (1.0 = normal)
    fn set_playback_rate(&mut self, rate: f32) -> Result<()>;
}

/// Opaque media reference, passed to the processor unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaContent {
    uri: String,
}

impl MediaContent {
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self { uri: uri.into() }
    }

    /// The null media: clears the player back to its baseline
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.uri.trim().is_empty()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for MediaContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("<null media>")
        } else {
            f.write_str(&self.uri)
        }
    }
}

/// One `set_media` call. Tells a `MediaReady` for replaced media apart
/// from one for the media being loaded now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LoadId(pub u64);

impl LoadId {
    pub fn next(self) -> Self {
        LoadId(self.0.wrapping_add(1))
    }
}

/// Asynchronous reports from the media processor
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The media opened by the `set_media` call `load` is ready to play
    MediaReady {
        load: LoadId,
        duration: Duration,
        seekable: bool,
        has_audio: bool,
        has_video: bool,
    },

    /// Playback clock moved
    PositionChanged(Duration),

    /// Buffer underrun; percent of the buffer filled so far
    Buffering(u8),

    /// Buffer recovered
    Buffered,

    /// A frame was written into the live texture
    FrameDecoded,

    /// Playback reached the end of the media
    EndOfMedia,

    /// The pipeline broke after it had started
    Failed(String),
}

/// Sending half of the consumer inbox, as seen by a media processor
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: Sender<ConsumerMessage>,
}

impl NotificationSink {
    pub(crate) fn new(tx: Sender<ConsumerMessage>) -> Self {
        Self { tx }
    }

    /// Queue a notification for the consumer context.
    /// Returns false once the consumer has shut down.
    pub fn notify(&self, notification: Notification) -> bool {
        self.tx.send(ConsumerMessage::Notification(notification)).is_ok()
    }
}
