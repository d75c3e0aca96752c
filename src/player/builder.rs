//! Builder that wires a media processor, a texture provider and the
//! consumer context into a [`PlayerControl`]

use crate::decoder::{MediaProcessor, NotificationSink};
use crate::internal_error;
use crate::player::consumer::{Consumer, ConsumerContext, ConsumerStats};
use crate::player::events::EventDispatcher;
use crate::player::state::SnapshotCache;
use crate::player::{CommandQueue, PlayerControl, PlayerEventHandler, PlayerSnapshot};
use crate::renderer::{HeapTextureProvider, TextureHandoff, TextureProvider};
use crate::utils::config::{Config, ConsumerMode, ControlConfig};
use crate::utils::error::{PlayerError, Result};
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

/// Player control builder for customized configuration
pub struct PlayerControlBuilder {
    config: ControlConfig,
    processor: Option<Box<dyn MediaProcessor>>,
    texture_provider: Option<Box<dyn TextureProvider>>,
    event_handlers: Vec<Box<dyn PlayerEventHandler>>,
}

impl Default for PlayerControlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerControlBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: ControlConfig::default(),
            processor: None,
            texture_provider: None,
            event_handlers: Vec::new(),
        }
    }

    /// Set control configuration
    pub fn with_config(mut self, config: ControlConfig) -> Self {
        self.config = config;
        self
    }

    /// The media processor commands are applied to. Required.
    pub fn with_processor(mut self, processor: Box<dyn MediaProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Texture allocator; defaults to [`HeapTextureProvider`]
    pub fn with_texture_provider(mut self, provider: Box<dyn TextureProvider>) -> Self {
        self.texture_provider = Some(provider);
        self
    }

    /// Add an event handler
    pub fn with_event_handler(mut self, handler: Box<dyn PlayerEventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    /// Build the control surface, starting the consumer worker in
    /// dedicated mode
    pub fn build(self) -> Result<PlayerControl> {
        let config = self.config;
        Config {
            control: config.clone(),
            ..Default::default()
        }
        .validate()?;

        let mut processor = self
            .processor
            .ok_or_else(|| PlayerError::InvalidInput("No media processor supplied".to_string()))?;
        let provider = self
            .texture_provider
            .unwrap_or_else(|| Box::new(HeapTextureProvider::new()));

        info!(
            "Building player control ({:?}, auto-play: {})",
            config.consumer_mode, config.auto_play
        );

        let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
        processor.bind(NotificationSink::new(inbox_tx.clone()));
        if let Err(err) = processor.set_volume(config.initial_volume) {
            warn!("Failed to apply initial volume: {}", err);
        }
        if let Err(err) = processor.set_playback_rate(config.initial_playback_rate) {
            warn!("Failed to apply initial playback rate: {}", err);
        }

        let processor = Arc::new(Mutex::new(processor));
        let queue = Arc::new(CommandQueue::new(inbox_tx.clone()));
        let textures = Arc::new(TextureHandoff::new(provider));
        let events = Arc::new(EventDispatcher::new(self.event_handlers));
        let stats = Arc::new(ConsumerStats::default());
        let cache = SnapshotCache::new(PlayerSnapshot::new(
            config.initial_volume,
            config.initial_playback_rate,
            config.default_frame_size,
        ));

        let consumer = Consumer::new(
            Arc::clone(&processor),
            Arc::clone(&textures),
            Arc::clone(&queue),
            cache.clone(),
            Arc::clone(&events),
            Arc::clone(&stats),
            config.auto_play,
        );
        let context = Arc::new(ConsumerContext::new(consumer, inbox_rx));

        let worker = match config.consumer_mode {
            ConsumerMode::Dedicated => {
                let context = Arc::clone(&context);
                let worker = thread::Builder::new()
                    .name("playctl-consumer".to_string())
                    .spawn(move || context.run())
                    .map_err(|e| internal_error!("Failed to spawn consumer thread: {}", e))?;
                Some(worker)
            }
            ConsumerMode::RenderLoop => None,
        };

        Ok(PlayerControl {
            queue,
            cache,
            events,
            processor,
            textures,
            context,
            stats,
            inbox: inbox_tx,
            mode: config.consumer_mode,
            worker,
        })
    }
}
