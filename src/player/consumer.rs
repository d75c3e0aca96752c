//! Consumer context: the single executor of queued commands
//!
//! Wake-ups from the command queue and notifications from the media
//! processor arrive on one channel, so command effects and pipeline reports
//! are applied in one total order. Only this context mutates the state
//! stacks; after each command or notification it commits a snapshot for
//! the getters and dispatches whatever changed.

use crate::decoder::{LoadId, MediaContent, MediaProcessor, Notification};
use crate::player::events::EventDispatcher;
use crate::player::state::{PlaybackProgress, SnapshotCache};
use crate::player::{
    Command, CommandKind, CommandQueue, MediaStatus, PlaybackStacks, PlayerEvent, PlayerState,
    QueuedCommand,
};
use crate::renderer::{FrameSize, TextureData, TextureHandle, TextureHandoff};
use crate::utils::error::{PlayerError, Result};
use crossbeam_channel::Receiver;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Everything the consumer context can be woken for
#[derive(Debug)]
pub enum ConsumerMessage {
    /// The command queue has something pending
    ProcessCommands,

    /// Report from the media processor
    Notification(Notification),

    /// Release what is left and stop
    Shutdown,
}

/// Counters updated by the consumer, readable from any thread
#[derive(Default)]
pub(crate) struct ConsumerStats {
    batches: AtomicU64,
    processed: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    notifications: AtomicU64,
}

impl ConsumerStats {
    pub fn snapshot(&self) -> DrainStats {
        DrainStats {
            batches: self.batches.load(Ordering::Relaxed),
            commands_processed: self.processed.load(Ordering::Relaxed),
            commands_rejected: self.rejected.load(Ordering::Relaxed),
            commands_failed: self.failed.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Consumer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainStats {
    /// Non-empty drains
    pub batches: u64,

    /// Commands taken off the queue, whatever their outcome
    pub commands_processed: u64,

    /// Commands dropped as invalid for the state they met
    pub commands_rejected: u64,

    /// Commands whose processor call failed
    pub commands_failed: u64,

    /// Processor notifications applied
    pub notifications: u64,
}

pub(crate) struct Consumer {
    processor: Arc<Mutex<Box<dyn MediaProcessor>>>,
    textures: Arc<TextureHandoff>,
    queue: Arc<CommandQueue>,
    cache: SnapshotCache,
    events: Arc<EventDispatcher>,
    stats: Arc<ConsumerStats>,
    auto_play: bool,

    stacks: PlaybackStacks,
    progress: PlaybackProgress,
    pending_seek: Option<Duration>,

    /// Identifies the last `set_media` handed to the processor
    load: LoadId,

    /// Texture last announced to the render context with `TextureReady`
    announced: Option<TextureHandle>,

    /// Events raised mid-command, flushed on commit
    outbox: Vec<PlayerEvent>,
    shut_down: bool,
}

impl Consumer {
    pub fn new(
        processor: Arc<Mutex<Box<dyn MediaProcessor>>>,
        textures: Arc<TextureHandoff>,
        queue: Arc<CommandQueue>,
        cache: SnapshotCache,
        events: Arc<EventDispatcher>,
        stats: Arc<ConsumerStats>,
        auto_play: bool,
    ) -> Self {
        Self {
            processor,
            textures,
            queue,
            cache,
            events,
            stats,
            auto_play,
            stacks: PlaybackStacks::default(),
            progress: PlaybackProgress::default(),
            pending_seek: None,
            load: LoadId::default(),
            announced: None,
            outbox: Vec::new(),
            shut_down: false,
        }
    }

    fn handle(&mut self, message: ConsumerMessage) {
        if self.shut_down {
            return;
        }
        match message {
            ConsumerMessage::ProcessCommands => self.drain_commands(),
            ConsumerMessage::Notification(notification) => self.notify(notification),
            ConsumerMessage::Shutdown => self.shutdown(),
        }
    }

    fn drain_commands(&mut self) {
        let queue = Arc::clone(&self.queue);
        let drained = queue.drain_and_process(|queued| self.process(queued));
        if drained > 0 {
            ConsumerStats::bump(&self.stats.batches);
            debug!("Drained {} command(s)", drained);
        }
    }

    fn process(&mut self, queued: QueuedCommand) {
        let QueuedCommand { seq, command } = queued;
        let kind = command.kind();
        debug!("Processing #{} {:?}", seq, kind);
        ConsumerStats::bump(&self.stats.processed);

        let checkpoint = self.stacks.checkpoint();
        match self.execute(command) {
            Ok(()) => {}
            Err(PlayerError::TransitionRejected { command, state }) => {
                ConsumerStats::bump(&self.stats.rejected);
                debug!("Dropped #{} {:?}: not valid while {:?}", seq, command, state);
            }
            Err(err @ PlayerError::InvalidMedia(_)) => {
                ConsumerStats::bump(&self.stats.failed);
                warn!("#{} {:?}: {}", seq, kind, err);
                self.stacks.state.reset(PlayerState::Stopped);
                self.stacks.media_status.reset(MediaStatus::InvalidMedia);
                self.progress = PlaybackProgress::default();
                self.outbox.push(PlayerEvent::Error {
                    message: err.to_string(),
                });
            }
            Err(err) => {
                ConsumerStats::bump(&self.stats.failed);
                warn!("#{} {:?} failed, reverting: {}", seq, kind, err);
                self.stacks.revert(checkpoint);
                self.stacks.media_status.push(MediaStatus::InvalidMedia);
                self.outbox.push(PlayerEvent::Error {
                    message: err.to_string(),
                });
            }
        }
        self.commit();
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SetMedia(media) => self.set_media(media),
            Command::Play(frame_size) => self.play(frame_size),
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::Seek(position) => self.seek(position),
            Command::FreeTextureData(texture) => {
                self.free_texture(texture);
                Ok(())
            }
        }
    }

    fn rejected(&self, command: CommandKind) -> PlayerError {
        PlayerError::TransitionRejected {
            command,
            state: self.stacks.state.top(),
        }
    }

    fn set_media(&mut self, media: MediaContent) -> Result<()> {
        if self.stacks.state.top() != PlayerState::Stopped {
            self.processor.lock().stop()?;
        }
        self.invalidate_texture();
        self.stacks.state.reset(PlayerState::Stopped);
        self.progress = PlaybackProgress::default();

        if media.is_null() {
            info!("Media cleared");
            self.stacks.media_status.reset(MediaStatus::NoMedia);
            return Ok(());
        }

        self.stacks.media_status.reset(MediaStatus::Loading);
        self.load = self.load.next();
        self.processor.lock().set_media(&media, self.load)?;
        info!("Loading {} ({:?})", media, self.load);

        if self.auto_play {
            let frame_size = self.cache.with(|s| s.frame_size);
            self.queue.append(Command::Play(frame_size));
        }
        Ok(())
    }

    fn play(&mut self, frame_size: FrameSize) -> Result<()> {
        let status = self.stacks.media_status.top();
        if self.stacks.state.top() == PlayerState::Playing || !status.has_media() {
            return Err(self.rejected(CommandKind::Play));
        }

        if status == MediaStatus::EndOfMedia {
            self.stacks.media_status.pop();
            if self.progress.seekable {
                self.pending_seek.get_or_insert(Duration::ZERO);
            }
        }

        if self.stacks.media_status.top().accepts_seek() && self.progress.seekable {
            if let Some(position) = self.pending_seek.take() {
                self.seek_now(position)?;
            }
        }

        self.processor.lock().play(frame_size)?;
        self.stacks.state.push(PlayerState::Playing);
        info!("Playing at {}", frame_size);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if self.stacks.state.top() != PlayerState::Playing {
            return Err(self.rejected(CommandKind::Pause));
        }

        self.processor.lock().pause()?;
        self.stacks.state.push(PlayerState::Paused);
        info!("Paused at {:?}", self.progress.position);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.stacks.state.top() != PlayerState::Stopped {
            self.processor.lock().stop()?;
        }

        self.stacks.state.reset(PlayerState::Stopped);
        if self.stacks.media_status.top() == MediaStatus::EndOfMedia {
            self.stacks.media_status.pop();
        }
        self.pending_seek = None;
        self.progress.position = Duration::ZERO;
        self.invalidate_texture();
        info!("Stopped");
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let status = self.stacks.media_status.top();
        if status.accepts_seek() {
            if !self.progress.seekable {
                return Err(self.rejected(CommandKind::Seek));
            }
            let position = if self.progress.duration.is_zero() {
                position
            } else {
                position.min(self.progress.duration)
            };
            self.seek_now(position)?;
            if status == MediaStatus::EndOfMedia {
                self.stacks.media_status.pop();
            }
            Ok(())
        } else if status == MediaStatus::InvalidMedia {
            Err(self.rejected(CommandKind::Seek))
        } else {
            debug!("Deferring seek to {:?} until media is loaded", position);
            self.pending_seek = Some(position);
            Ok(())
        }
    }

    fn seek_now(&mut self, position: Duration) -> Result<()> {
        self.processor.lock().seek(position)?;
        self.progress.position = position;
        debug!("Seeked to {:?}", position);
        Ok(())
    }

    fn free_texture(&mut self, texture: TextureData) {
        let handle = texture.handle();
        self.textures.release(texture);
        if self.announced == Some(handle) {
            self.announced = None;
            self.outbox.push(PlayerEvent::TextureInvalidated(handle));
        }
    }

    fn invalidate_texture(&mut self) {
        if let Some(handle) = self.announced.take() {
            self.outbox.push(PlayerEvent::TextureInvalidated(handle));
        }
    }

    fn notify(&mut self, notification: Notification) {
        ConsumerStats::bump(&self.stats.notifications);
        self.apply(notification);
        self.commit();
    }

    fn apply(&mut self, notification: Notification) {
        let status = self.stacks.media_status.top();
        match notification {
            Notification::MediaReady {
                load,
                duration,
                seekable,
                has_audio,
                has_video,
            } => {
                if load != self.load {
                    debug!("Ignoring MediaReady for replaced media {:?}", load);
                    return;
                }
                if status != MediaStatus::Loading {
                    debug!("Ignoring MediaReady while {:?}", status);
                    return;
                }
                self.stacks.media_status.push(MediaStatus::Loaded);
                self.progress.duration = duration;
                self.progress.seekable = seekable;
                self.progress.audio_available = has_audio;
                self.progress.video_available = has_video;
                self.progress.buffer_status = 100;
                info!("Media loaded ({:?}, seekable: {})", duration, seekable);

                if let Some(position) = self.pending_seek.take() {
                    if !seekable {
                        debug!("Dropping deferred seek, media is not seekable");
                    } else if let Err(err) = self.seek_now(position) {
                        warn!("Deferred seek to {:?} failed: {}", position, err);
                    }
                }
            }
            Notification::PositionChanged(position) => {
                // Ticks still in flight when playback stopped
                if status.has_media() && self.stacks.state.top() != PlayerState::Stopped {
                    self.progress.position = position;
                }
            }
            Notification::Buffering(percent) => {
                if matches!(status, MediaStatus::Loaded | MediaStatus::Buffering) {
                    self.progress.buffer_status = percent.min(100);
                    self.stacks.media_status.push(MediaStatus::Buffering);
                }
            }
            Notification::Buffered => {
                if status == MediaStatus::Buffering {
                    self.stacks.media_status.pop();
                    self.progress.buffer_status = 100;
                }
            }
            Notification::FrameDecoded => match self.textures.live() {
                Some(handle) if self.stacks.state.top() != PlayerState::Stopped => {
                    trace!("Frame ready in {}", handle);
                    match self.announced.replace(handle) {
                        Some(old) if old != handle => {
                            self.outbox.push(PlayerEvent::TextureInvalidated(old));
                        }
                        _ => {}
                    }
                    self.outbox.push(PlayerEvent::TextureReady(handle));
                }
                _ => trace!("Frame decoded with no texture to announce"),
            },
            Notification::EndOfMedia => {
                if !matches!(status, MediaStatus::Loaded | MediaStatus::Buffering) {
                    return;
                }
                if status == MediaStatus::Buffering {
                    self.stacks.media_status.pop();
                }
                self.progress.buffer_status = 100;
                self.stacks.media_status.push(MediaStatus::EndOfMedia);
                self.stacks.state.reset(PlayerState::Stopped);
                self.progress.position = self.progress.duration;
                self.pending_seek = None;
                info!("End of media");
            }
            Notification::Failed(reason) => {
                if !status.has_media() {
                    return;
                }
                warn!("Pipeline failure: {}", reason);
                // Nothing decodes past a failure, whatever the stack held
                if self.stacks.state.top() != PlayerState::Stopped {
                    if let Err(err) = self.processor.lock().stop() {
                        warn!("Stopping failed pipeline: {}", err);
                    }
                }
                self.stacks.state.reset(PlayerState::Stopped);
                self.stacks.media_status.push(MediaStatus::InvalidMedia);
                self.pending_seek = None;
                self.invalidate_texture();
                self.outbox.push(PlayerEvent::Error {
                    message: PlayerError::pipeline(reason).to_string(),
                });
            }
        }
    }

    fn commit(&mut self) {
        let mut events = self.cache.commit(&self.stacks, &self.progress);
        events.append(&mut self.outbox);
        self.events.dispatch_all(events);
    }

    /// Release textures still waiting in the queue, then refuse further work
    fn shutdown(&mut self) {
        let mut released = 0;
        for queued in self.queue.take_all() {
            if let Command::FreeTextureData(texture) = queued.command {
                self.textures.release(texture);
                released += 1;
            }
        }

        if self.stacks.state.top() != PlayerState::Stopped {
            if let Err(err) = self.processor.lock().stop() {
                warn!("Stopping pipeline on shutdown failed: {}", err);
            }
        }

        self.shut_down = true;
        info!("Consumer shut down ({} queued texture(s) released)", released);
    }
}

/// The consumer plus its inbox; at most one thread drains at a time
pub(crate) struct ConsumerContext {
    consumer: Mutex<Consumer>,
    inbox: Receiver<ConsumerMessage>,
}

impl ConsumerContext {
    pub fn new(consumer: Consumer, inbox: Receiver<ConsumerMessage>) -> Self {
        Self {
            consumer: Mutex::new(consumer),
            inbox,
        }
    }

    /// Handle every message already waiting, without blocking.
    ///
    /// Returns immediately if another drain is active, including one further
    /// up this thread's stack.
    pub fn pump(&self) -> usize {
        let Some(mut consumer) = self.consumer.try_lock() else {
            debug!("Drain already active, skipping pump");
            return 0;
        };

        let mut handled = 0;
        while !consumer.shut_down {
            match self.inbox.try_recv() {
                Ok(message) => {
                    consumer.handle(message);
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        handled
    }

    /// Block on the inbox until shutdown. Used by the dedicated worker.
    pub fn run(&self) {
        let mut consumer = self.consumer.lock();
        info!("Consumer context running");
        while !consumer.shut_down {
            match self.inbox.recv() {
                Ok(message) => consumer.handle(message),
                Err(_) => break,
            }
        }
        info!("Consumer context stopped");
    }
}
