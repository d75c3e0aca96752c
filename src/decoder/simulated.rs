//! Simulated media processor
//!
//! Decodes nothing. It resolves `sim://` URIs and existing file paths,
//! reports readiness straight away and, when given a frame interval, runs a
//! clock thread that advances the position and announces decoded frames
//! until the end of the media. Failures can be injected per operation.

use crate::decoder::{LoadId, MediaContent, MediaProcessor, Notification, NotificationSink};
use crate::renderer::FrameSize;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use crossbeam_channel::{RecvTimeoutError, Sender};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const SIM_SCHEME: &str = "sim://";

/// Behaviour of the simulated pipeline
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Reported media duration
    pub duration: Duration,

    /// Whether opened media can be seeked
    pub seekable: bool,

    /// Whether opened media reports an audio stream
    pub has_audio: bool,

    /// Clock tick; `None` means no clock thread, one frame per `play`
    pub frame_interval: Option<Duration>,

    /// Send `MediaReady` as soon as media is opened
    pub report_ready: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            seekable: true,
            has_audio: true,
            frame_interval: None,
            report_ready: true,
        }
    }
}

/// Operations the processor can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorOp {
    SetMedia,
    Play,
    Pause,
    Stop,
    Seek,
    SetVolume,
    SetMuted,
    SetPlaybackRate,
}

#[derive(Debug)]
struct Shared {
    calls: Vec<ProcessorOp>,
    failures: HashSet<ProcessorOp>,
    load: Option<LoadId>,
    position: Duration,
    volume: f32,
    muted: bool,
    rate: f32,
}

/// Observer/controller for a [`SimulatedProcessor`] that has been moved
/// into the control surface
#[derive(Clone)]
pub struct SimulatedHandle {
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedHandle {
    /// Make the next call of `op` fail with a pipeline failure
    pub fn fail_next(&self, op: ProcessorOp) {
        self.shared.lock().failures.insert(op);
    }

    /// Every operation invoked so far, in order
    pub fn calls(&self) -> Vec<ProcessorOp> {
        self.shared.lock().calls.clone()
    }

    pub fn position(&self) -> Duration {
        self.shared.lock().position
    }

    /// Load id of the media opened last
    pub fn current_load(&self) -> Option<LoadId> {
        self.shared.lock().load
    }

    pub fn volume(&self) -> f32 {
        self.shared.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.shared.lock().muted
    }

    pub fn playback_rate(&self) -> f32 {
        self.shared.lock().rate
    }
}

struct Clock {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

pub struct SimulatedProcessor {
    config: SimulatedConfig,
    shared: Arc<Mutex<Shared>>,
    sink: Option<NotificationSink>,
    media: Option<MediaContent>,
    clock: Option<Clock>,
}

impl SimulatedProcessor {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Mutex::new(Shared {
                calls: Vec::new(),
                failures: HashSet::new(),
                load: None,
                position: Duration::ZERO,
                volume: 1.0,
                muted: false,
                rate: 1.0,
            })),
            sink: None,
            media: None,
            clock: None,
        }
    }

    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Record the call and consume an injected failure, if any
    fn enter(&self, op: ProcessorOp) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.calls.push(op);
        if shared.failures.remove(&op) {
            return Err(PlayerError::pipeline(format!("injected {:?} failure", op)));
        }
        Ok(())
    }

    fn notify(&self, notification: Notification) {
        if let Some(sink) = &self.sink {
            sink.notify(notification);
        }
    }

    fn resolve(media: &MediaContent) -> Result<()> {
        let uri = media.uri();
        if uri.starts_with(SIM_SCHEME) && uri.len() > SIM_SCHEME.len() {
            return Ok(());
        }
        if Path::new(uri).exists() {
            return Ok(());
        }
        Err(PlayerError::invalid_media(format!("cannot open {}", uri)))
    }

    fn start_clock(&mut self, interval: Duration) -> Result<()> {
        self.stop_clock();

        let Some(sink) = self.sink.clone() else {
            return Ok(());
        };
        let shared = Arc::clone(&self.shared);
        let duration = self.config.duration;
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("sim-decoder".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }

                let (position, finished) = {
                    let mut shared = shared.lock();
                    let step = interval.mul_f32(shared.rate);
                    shared.position = (shared.position + step).min(duration);
                    (shared.position, shared.position >= duration)
                };

                trace!("Simulated frame at {:?}", position);
                sink.notify(Notification::PositionChanged(position));
                sink.notify(Notification::FrameDecoded);

                if finished {
                    sink.notify(Notification::EndOfMedia);
                    break;
                }
            })
            .pipeline_err("Failed to spawn decoder clock")?;

        self.clock = Some(Clock { stop_tx, thread });
        Ok(())
    }

    fn stop_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            let _ = clock.stop_tx.try_send(());
            if clock.thread.join().is_err() {
                warn!("Simulated decoder clock panicked");
            }
        }
    }
}

impl MediaProcessor for SimulatedProcessor {
    fn bind(&mut self, sink: NotificationSink) {
        self.sink = Some(sink);
    }

    fn set_media(&mut self, media: &MediaContent, load: LoadId) -> Result<()> {
        self.enter(ProcessorOp::SetMedia)?;
        self.stop_clock();
        self.media = None;
        {
            let mut shared = self.shared.lock();
            shared.position = Duration::ZERO;
            shared.load = Some(load);
        }

        Self::resolve(media)?;
        info!("Simulated pipeline opened {}", media);
        self.media = Some(media.clone());

        if self.config.report_ready {
            self.notify(Notification::MediaReady {
                load,
                duration: self.config.duration,
                seekable: self.config.seekable,
                has_audio: self.config.has_audio,
                has_video: true,
            });
        }
        Ok(())
    }

    fn play(&mut self, frame_size: FrameSize) -> Result<()> {
        self.enter(ProcessorOp::Play)?;
        if self.media.is_none() {
            return Err(PlayerError::pipeline("no media opened"));
        }

        debug!("Simulated pipeline decoding at {}", frame_size);
        match self.config.frame_interval {
            Some(interval) => self.start_clock(interval)?,
            None => self.notify(Notification::FrameDecoded),
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.enter(ProcessorOp::Pause)?;
        self.stop_clock();
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.enter(ProcessorOp::Stop)?;
        self.stop_clock();
        self.shared.lock().position = Duration::ZERO;
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.enter(ProcessorOp::Seek)?;
        if !self.config.seekable {
            return Err(PlayerError::pipeline("media is not seekable"));
        }

        let position = position.min(self.config.duration);
        self.shared.lock().position = position;
        self.notify(Notification::PositionChanged(position));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.enter(ProcessorOp::SetVolume)?;
        self.shared.lock().volume = volume;
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.enter(ProcessorOp::SetMuted)?;
        self.shared.lock().muted = muted;
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f32) -> Result<()> {
        self.enter(ProcessorOp::SetPlaybackRate)?;
        self.shared.lock().rate = rate;
        Ok(())
    }
}

impl Drop for SimulatedProcessor {
    fn drop(&mut self) {
        self.stop_clock();
    }
}
