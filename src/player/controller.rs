//! Player control facade for playctl
//!
//! `PlayerControl` is what the application and the render context talk to.
//! Queued mutators only append a command and return; getters read the
//! snapshot the consumer context last committed; volume, mute and rate go
//! straight to the media processor without touching the queue.

use crate::decoder::{MediaContent, MediaProcessor, NotificationSink};
use crate::player::consumer::{ConsumerContext, ConsumerMessage, ConsumerStats, DrainStats};
use crate::player::events::{ChannelEventHandler, EventDispatcher};
use crate::player::state::SnapshotCache;
use crate::player::{
    Command, CommandQueue, MediaStatus, PlayerEvent, PlayerEventHandler, PlayerSnapshot,
    PlayerState, TimeRange,
};
use crate::renderer::{FrameSize, TextureHandle, TextureHandoff};
use crate::utils::config::ConsumerMode;
use crate::utils::error::{PlayerError, Result};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Lowest playback rate accepted by `set_playback_rate`
pub const MIN_PLAYBACK_RATE: f32 = 0.25;

/// Highest playback rate accepted by `set_playback_rate`
pub const MAX_PLAYBACK_RATE: f32 = 4.0;

/// Control surface over one media processor and one texture slot
pub struct PlayerControl {
    pub(super) queue: Arc<CommandQueue>,
    pub(super) cache: SnapshotCache,
    pub(super) events: Arc<EventDispatcher>,
    pub(super) processor: Arc<Mutex<Box<dyn MediaProcessor>>>,
    pub(super) textures: Arc<TextureHandoff>,
    pub(super) context: Arc<ConsumerContext>,
    pub(super) stats: Arc<ConsumerStats>,
    pub(super) inbox: Sender<ConsumerMessage>,
    pub(super) mode: ConsumerMode,
    pub(super) worker: Option<JoinHandle<()>>,
}

/// Store `value` in `slot`, reporting whether it differed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl PlayerControl {
    // Queued mutators

    /// Replace the current media. A null media clears the player.
    pub fn set_media(&self, media: MediaContent) {
        let changed = self.cache.update(|s| replace(&mut s.media, media.clone()));
        if changed {
            self.events.dispatch(PlayerEvent::MediaChanged(media.clone()));
        }
        self.queue.append(Command::SetMedia(media));
    }

    /// Start or resume playback at the current frame size
    pub fn play(&self) {
        let frame_size = self.frame_size();
        self.queue.append(Command::Play(frame_size));
    }

    pub fn pause(&self) {
        self.queue.append(Command::Pause);
    }

    pub fn stop(&self) {
        self.queue.append(Command::Stop);
    }

    /// Seek. Before the media has loaded the position is kept and applied
    /// once it has.
    pub fn set_position(&self, position: Duration) {
        self.queue.append(Command::Seek(position));
    }

    // Direct mutators

    /// Set volume, clamped to 0.0 - 1.0
    pub fn set_volume(&self, volume: f32) {
        if volume.is_nan() {
            warn!("Ignoring NaN volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        if !self.cache.update(|s| replace(&mut s.volume, volume)) {
            return;
        }

        if let Err(err) = self.processor.lock().set_volume(volume) {
            warn!("Failed to apply volume {:.2}: {}", volume, err);
        }
        self.events.dispatch(PlayerEvent::VolumeChanged(volume));
    }

    pub fn set_muted(&self, muted: bool) {
        if !self.cache.update(|s| replace(&mut s.muted, muted)) {
            return;
        }

        if let Err(err) = self.processor.lock().set_muted(muted) {
            warn!("Failed to apply mute {}: {}", muted, err);
        }
        self.events.dispatch(PlayerEvent::MutedChanged(muted));
    }

    /// Set playback speed, clamped to the supported range
    pub fn set_playback_rate(&self, rate: f32) {
        if rate.is_nan() {
            warn!("Ignoring NaN playback rate");
            return;
        }
        let rate = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        if !self.cache.update(|s| replace(&mut s.playback_rate, rate)) {
            return;
        }

        if let Err(err) = self.processor.lock().set_playback_rate(rate) {
            warn!("Failed to apply playback rate {:.2}: {}", rate, err);
        }
        self.events.dispatch(PlayerEvent::PlaybackRateChanged(rate));
    }

    /// Frame size passed with the next Play
    pub fn set_frame_size(&self, size: FrameSize) -> Result<()> {
        if size.is_empty() {
            return Err(PlayerError::InvalidInput(format!("Empty frame size {}", size)));
        }
        self.cache.update(|s| s.frame_size = size);
        debug!("Frame size set to {}", size);
        Ok(())
    }

    // Getters

    pub fn state(&self) -> PlayerState {
        self.cache.with(|s| s.state)
    }

    pub fn media_status(&self) -> MediaStatus {
        self.cache.with(|s| s.media_status)
    }

    pub fn position(&self) -> Duration {
        self.cache.with(|s| s.position)
    }

    pub fn duration(&self) -> Duration {
        self.cache.with(|s| s.duration)
    }

    /// Buffer fill in percent
    pub fn buffer_status(&self) -> u8 {
        self.cache.with(|s| s.buffer_status)
    }

    pub fn volume(&self) -> f32 {
        self.cache.with(|s| s.volume)
    }

    pub fn is_muted(&self) -> bool {
        self.cache.with(|s| s.muted)
    }

    pub fn is_audio_available(&self) -> bool {
        self.cache.with(|s| s.audio_available)
    }

    pub fn is_video_available(&self) -> bool {
        self.cache.with(|s| s.video_available)
    }

    pub fn is_seekable(&self) -> bool {
        self.cache.with(|s| s.seekable)
    }

    pub fn available_playback_ranges(&self) -> Vec<TimeRange> {
        self.cache.with(|s| s.available_ranges.clone())
    }

    pub fn playback_rate(&self) -> f32 {
        self.cache.with(|s| s.playback_rate)
    }

    /// Media last passed to `set_media`, even if not yet applied
    pub fn media(&self) -> MediaContent {
        self.cache.with(|s| s.media.clone())
    }

    pub fn frame_size(&self) -> FrameSize {
        self.cache.with(|s| s.frame_size)
    }

    /// Every getter at once, from a single committed state
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.cache.read()
    }

    pub fn stats(&self) -> DrainStats {
        self.stats.snapshot()
    }

    pub fn consumer_mode(&self) -> ConsumerMode {
        self.mode
    }

    /// Commands appended but not yet drained
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Handle for a media processor living outside the control surface
    pub fn notification_sink(&self) -> NotificationSink {
        NotificationSink::new(self.inbox.clone())
    }

    // Render context

    /// The render context's graphics state is usable
    pub fn on_scene_graph_initialized(&self) {
        self.textures.mark_scene_graph_initialized();
    }

    /// Allocate the texture frames are decoded into
    ///
    /// A texture already in the slot is displaced and released on the
    /// consumer context.
    pub fn instantiate_texture(&self, size: FrameSize) -> Result<TextureHandle> {
        let (handle, displaced) = self.textures.instantiate(size)?;
        if let Some(old) = displaced {
            self.queue.append(Command::FreeTextureData(old));
        }
        info!("Instantiated {} at {}", handle, size);
        Ok(handle)
    }

    /// Give back the texture named by `handle`
    ///
    /// Returns false if `handle` is not the live texture, in which case
    /// nothing is freed.
    pub fn free_texture(&self, handle: TextureHandle) -> bool {
        match self.textures.take(handle) {
            Some(texture) => {
                self.queue.append(Command::FreeTextureData(texture));
                true
            }
            None => {
                debug!("Ignoring free of stale texture {}", handle);
                false
            }
        }
    }

    pub fn live_texture(&self) -> Option<TextureHandle> {
        self.textures.live()
    }

    /// Hook for the render loop, called once per frame before drawing.
    /// Drains the queue when the render loop is the consumer context.
    pub fn on_before_rendering(&self) -> usize {
        match self.mode {
            ConsumerMode::RenderLoop => self.context.pump(),
            ConsumerMode::Dedicated => 0,
        }
    }

    /// Drain on the calling thread, whatever the consumer mode.
    /// Returns 0 when another drain is active.
    pub fn process_pending_commands(&self) -> usize {
        self.context.pump()
    }

    // Events

    pub fn add_event_handler(&self, handler: Box<dyn PlayerEventHandler>) {
        self.events.add(handler);
    }

    /// Receive every event from now on through a channel
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.events.add(Box::new(ChannelEventHandler::new(tx)));
        rx
    }
}

impl Drop for PlayerControl {
    fn drop(&mut self) {
        if self.inbox.send(ConsumerMessage::Shutdown).is_err() {
            debug!("Consumer inbox already closed");
        }

        match self.worker.take() {
            Some(worker) => {
                if worker.join().is_err() {
                    warn!("Consumer worker panicked");
                }
            }
            None => {
                self.context.pump();
            }
        }
        debug!("Player control dropped");
    }
}
