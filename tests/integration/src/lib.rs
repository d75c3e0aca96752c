//! Integration test utilities for playctl
//!
//! This module provides common utilities for integration testing including:
//! - Temporary media files the simulated processor can open
//! - Mock processor and texture provider
//! - Helpers for waiting on asynchronous state changes

use anyhow::Result;
use playctl::decoder::{SimulatedConfig, SimulatedHandle, SimulatedProcessor};
use playctl::player::{PlayerControl, PlayerControlBuilder};
use playctl::renderer::HeapTextureProvider;
use playctl::utils::{ConsumerMode, ControlConfig};
use playctl::MediaContent;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture for integration tests
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub media_file: PathBuf,
}

impl TestFixture {
    /// Create a fixture holding one media file on disk
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let media_file = temp_dir.path().join("clip.mp4");
        std::fs::write(&media_file, b"not really video")?;

        Ok(Self {
            temp_dir,
            media_file,
        })
    }

    /// Get the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn media(&self) -> MediaContent {
        MediaContent::new(self.media_file.to_string_lossy())
    }
}

/// A control surface over a simulated processor and a heap texture pool
pub struct SimulatedControl {
    pub control: PlayerControl,
    pub processor: SimulatedHandle,
    pub textures: HeapTextureProvider,
}

impl SimulatedControl {
    pub fn new(mode: ConsumerMode, config: SimulatedConfig) -> Result<Self> {
        let processor = SimulatedProcessor::new(config);
        let handle = processor.handle();
        let textures = HeapTextureProvider::new();

        let control = PlayerControlBuilder::new()
            .with_config(ControlConfig {
                consumer_mode: mode,
                ..Default::default()
            })
            .with_processor(Box::new(processor))
            .with_texture_provider(Box::new(textures.clone()))
            .build()?;

        Ok(Self {
            control,
            processor: handle,
            textures,
        })
    }
}

/// Mocks for the two collaborator traits
pub mod mocks {
    use mockall::mock;
    use playctl::decoder::{LoadId, MediaContent, MediaProcessor, NotificationSink};
    use playctl::renderer::{FrameSize, TextureData, TextureProvider};
    use std::time::Duration;

    mock! {
        pub Processor {}

        impl MediaProcessor for Processor {
            fn bind(&mut self, sink: NotificationSink);
            fn set_media(&mut self, media: &MediaContent, load: LoadId) -> playctl::Result<()>;
            fn play(&mut self, frame_size: FrameSize) -> playctl::Result<()>;
            fn pause(&mut self) -> playctl::Result<()>;
            fn stop(&mut self) -> playctl::Result<()>;
            fn seek(&mut self, position: Duration) -> playctl::Result<()>;
            fn set_volume(&mut self, volume: f32) -> playctl::Result<()>;
            fn set_muted(&mut self, muted: bool) -> playctl::Result<()>;
            fn set_playback_rate(&mut self, rate: f32) -> playctl::Result<()>;
        }
    }

    mock! {
        pub Provider {}

        impl TextureProvider for Provider {
            fn instantiate(&mut self, size: FrameSize) -> playctl::Result<TextureData>;
            fn release(&mut self, texture: TextureData);
        }
    }

    /// Processor mock that accepts the calls every build makes
    pub fn processor() -> MockProcessor {
        let mut processor = MockProcessor::new();
        processor.expect_bind().times(1).return_const(());
        processor.expect_set_volume().returning(|_| Ok(()));
        processor.expect_set_playback_rate().returning(|_| Ok(()));
        processor
    }
}

/// Helpers for waiting on the consumer context
pub mod wait {
    use crossbeam_channel::Receiver;
    use playctl::PlayerEvent;
    use std::time::{Duration, Instant};

    const POLL: Duration = Duration::from_millis(5);

    /// Poll `condition` until it holds or `timeout` passes
    pub async fn until<F>(timeout: Duration, mut condition: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(POLL).await;
        }
        condition()
    }

    /// First event matching `predicate`, skipping the rest
    pub async fn for_event<F>(
        events: &Receiver<PlayerEvent>,
        timeout: Duration,
        mut predicate: F,
    ) -> Option<PlayerEvent>
    where
        F: FnMut(&PlayerEvent) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            for event in events.try_iter() {
                if predicate(&event) {
                    return Some(event);
                }
            }
            tokio::time::sleep(POLL).await;
        }
        None
    }
}
