//! Player state management for playctl
//!
//! Two independent value stacks hold the revertible history of playback
//! state and media status. The consumer context is their only writer; other
//! threads read the [`PlayerSnapshot`] it commits after every command or
//! notification, never the stacks themselves.

use crate::decoder::MediaContent;
use crate::player::{MediaStatus, PlayerEvent, PlayerState};
use crate::renderer::FrameSize;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Entries kept above the base before the oldest are folded away
const MAX_STACK_DEPTH: usize = 32;

/// Value stack with a permanent base entry
#[derive(Debug, Clone, PartialEq)]
pub struct StateStack<T> {
    entries: Vec<T>,
}

impl<T: Copy + PartialEq + Debug> StateStack<T> {
    pub fn new(base: T) -> Self {
        Self {
            entries: vec![base],
        }
    }

    /// Current value
    pub fn top(&self) -> T {
        // The base entry is never removed
        self.entries[self.entries.len() - 1]
    }

    /// Enter a new value. Pushing the current top is a no-op.
    pub fn push(&mut self, value: T) {
        if self.top() == value {
            return;
        }
        if self.entries.len() > MAX_STACK_DEPTH {
            self.entries.remove(1);
        }
        self.entries.push(value);
    }

    /// Revert to the previous value. The base entry stays put.
    pub fn pop(&mut self) -> Option<T> {
        if self.entries.len() > 1 {
            self.entries.pop()
        } else {
            None
        }
    }

    /// Drop all history and start again from `base`
    pub fn reset(&mut self, base: T) {
        self.entries.clear();
        self.entries.push(base);
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Oldest first
    pub fn history(&self) -> &[T] {
        &self.entries
    }
}

/// Playback state and media status histories, kept independent
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStacks {
    pub state: StateStack<PlayerState>,
    pub media_status: StateStack<MediaStatus>,
}

impl Default for PlaybackStacks {
    fn default() -> Self {
        Self {
            state: StateStack::new(PlayerState::Stopped),
            media_status: StateStack::new(MediaStatus::NoMedia),
        }
    }
}

impl PlaybackStacks {
    /// Capture both stacks before a command runs
    pub fn checkpoint(&self) -> PlaybackStacks {
        self.clone()
    }

    /// Put both stacks back to a checkpoint
    pub fn revert(&mut self, checkpoint: PlaybackStacks) {
        *self = checkpoint;
    }
}

/// Half-open time interval the player can seek within
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: Duration,
    pub end: Duration,
}

/// Progress fields owned by the consumer context
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PlaybackProgress {
    pub position: Duration,
    pub duration: Duration,
    pub buffer_status: u8,
    pub seekable: bool,
    pub audio_available: bool,
    pub video_available: bool,
}

/// Everything the getters report, as of the last committed change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub state: PlayerState,
    pub media_status: MediaStatus,
    pub position: Duration,
    pub duration: Duration,
    pub buffer_status: u8,
    pub seekable: bool,
    pub audio_available: bool,
    pub video_available: bool,
    pub available_ranges: Vec<TimeRange>,

    // Written by the facade
    pub volume: f32,
    pub muted: bool,
    pub playback_rate: f32,
    pub media: MediaContent,
    pub frame_size: FrameSize,
}

impl PlayerSnapshot {
    pub(crate) fn new(volume: f32, playback_rate: f32, frame_size: FrameSize) -> Self {
        Self {
            state: PlayerState::Stopped,
            media_status: MediaStatus::NoMedia,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            buffer_status: 0,
            seekable: false,
            audio_available: false,
            video_available: false,
            available_ranges: Vec::new(),
            volume,
            muted: false,
            playback_rate,
            media: MediaContent::null(),
            frame_size,
        }
    }
}

/// Shared, lock-protected snapshot
#[derive(Clone)]
pub(crate) struct SnapshotCache {
    inner: Arc<RwLock<PlayerSnapshot>>,
}

impl SnapshotCache {
    pub fn new(snapshot: PlayerSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn read(&self) -> PlayerSnapshot {
        self.inner.read().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&PlayerSnapshot) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut PlayerSnapshot) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Publish the consumer-owned fields in one write and describe what changed
    pub fn commit(&self, stacks: &PlaybackStacks, progress: &PlaybackProgress) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        let mut snapshot = self.inner.write();

        let state = stacks.state.top();
        if snapshot.state != state {
            snapshot.state = state;
            events.push(PlayerEvent::StateChanged(state));
        }

        let status = stacks.media_status.top();
        if snapshot.media_status != status {
            snapshot.media_status = status;
            events.push(PlayerEvent::MediaStatusChanged(status));
        }

        if snapshot.duration != progress.duration {
            snapshot.duration = progress.duration;
            events.push(PlayerEvent::DurationChanged(progress.duration));
        }

        if snapshot.position != progress.position {
            snapshot.position = progress.position;
            events.push(PlayerEvent::PositionChanged(progress.position));
        }

        if snapshot.buffer_status != progress.buffer_status {
            snapshot.buffer_status = progress.buffer_status;
            events.push(PlayerEvent::BufferStatusChanged(progress.buffer_status));
        }

        if snapshot.seekable != progress.seekable {
            snapshot.seekable = progress.seekable;
            events.push(PlayerEvent::SeekableChanged(progress.seekable));
        }

        if snapshot.audio_available != progress.audio_available
            || snapshot.video_available != progress.video_available
        {
            snapshot.audio_available = progress.audio_available;
            snapshot.video_available = progress.video_available;
            events.push(PlayerEvent::AvailabilityChanged {
                audio: progress.audio_available,
                video: progress.video_available,
            });
        }

        snapshot.available_ranges = if progress.seekable && !progress.duration.is_zero() {
            vec![TimeRange {
                start: Duration::ZERO,
                end: progress.duration,
            }]
        } else {
            Vec::new()
        };

        events
    }
}
