//! Commands: one value per requested pipeline operation

use crate::decoder::MediaContent;
use crate::renderer::{FrameSize, TextureData};
use std::time::Duration;

/// A requested operation and its parameters
///
/// Owned by the queue from append until drained, then by the consumer
/// until it has been applied.
#[derive(Debug)]
pub enum Command {
    SetMedia(MediaContent),
    Play(FrameSize),
    Pause,
    Stop,
    Seek(Duration),
    FreeTextureData(TextureData),
}

/// Payload-free tag of a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SetMedia,
    Play,
    Pause,
    Stop,
    Seek,
    FreeTextureData,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetMedia(_) => CommandKind::SetMedia,
            Command::Play(_) => CommandKind::Play,
            Command::Pause => CommandKind::Pause,
            Command::Stop => CommandKind::Stop,
            Command::Seek(_) => CommandKind::Seek,
            Command::FreeTextureData(_) => CommandKind::FreeTextureData,
        }
    }
}

/// A command stamped with its enqueue order
#[derive(Debug)]
pub struct QueuedCommand {
    /// Monotonic per queue, assigned under the queue lock
    pub seq: u64,
    pub command: Command,
}
