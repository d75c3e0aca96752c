//! Integration tests for the playctl control surface
//!
//! These tests verify the complete control flow including:
//! - Ordered application of queued commands
//! - Media status and state transitions driven by the processor
//! - Texture hand-off and release
//! - Error handling and resource cleanup

use anyhow::Result;
use mockall::predicate::eq;
use mockall::Sequence;
use playctl::decoder::SimulatedConfig;
use playctl::player::{PlayerControlBuilder, PlayerEvent};
use playctl::renderer::HeapTextureProvider;
use playctl::utils::{Config, ConsumerMode, ControlConfig};
use playctl::{
    FrameSize, LoadId, MediaContent, MediaStatus, Notification, PlayerError, PlayerState,
    TextureData, TextureHandle,
};
use playctl_integration_tests::{mocks, wait, SimulatedControl, TestFixture};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn clocked(duration_ms: u64) -> SimulatedConfig {
    SimulatedConfig {
        duration: Duration::from_millis(duration_ms),
        frame_interval: Some(Duration::from_millis(5)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_initial_state() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, SimulatedConfig::default())?;
    let control = &sim.control;

    assert_eq!(control.state(), PlayerState::Stopped);
    assert_eq!(control.media_status(), MediaStatus::NoMedia);
    assert_eq!(control.position(), Duration::ZERO);
    assert_eq!(control.duration(), Duration::ZERO);
    assert!(control.media().is_null());
    assert_eq!(control.live_texture(), None);

    Ok(())
}

#[tokio::test]
async fn test_load_file_and_play() -> Result<()> {
    let fixture = TestFixture::new()?;
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, SimulatedConfig::default())?;
    let control = &sim.control;

    control.set_media(fixture.media());
    control.play();

    assert!(wait::until(TIMEOUT, || control.state() == PlayerState::Playing).await);
    assert!(wait::until(TIMEOUT, || control.media_status() == MediaStatus::Loaded).await);
    assert!(control.is_seekable());
    assert!(control.is_video_available());
    assert_eq!(control.available_playback_ranges().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_playback_runs_to_end_of_media() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, clocked(100))?;
    let control = &sim.control;
    let events = control.subscribe();

    control.set_media(MediaContent::new("sim://short"));
    control.play();

    let end = wait::for_event(&events, TIMEOUT, |e| {
        *e == PlayerEvent::MediaStatusChanged(MediaStatus::EndOfMedia)
    })
    .await;
    assert!(end.is_some());

    assert!(wait::until(TIMEOUT, || control.state() == PlayerState::Stopped).await);
    assert_eq!(control.position(), Duration::from_millis(100));

    Ok(())
}

#[tokio::test]
async fn test_play_pause_operations() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, clocked(10_000))?;
    let control = &sim.control;

    control.set_media(MediaContent::new("sim://long"));
    control.play();
    assert!(wait::until(TIMEOUT, || control.position() > Duration::ZERO).await);

    control.pause();
    assert!(wait::until(TIMEOUT, || control.state() == PlayerState::Paused).await);

    // The clock is stopped; let any in-flight tick land before sampling
    tokio::time::sleep(Duration::from_millis(30)).await;
    let position_at_pause = control.position();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(control.position(), position_at_pause);

    control.play();
    assert!(wait::until(TIMEOUT, || control.position() > position_at_pause).await);

    control.stop();
    assert!(wait::until(TIMEOUT, || control.state() == PlayerState::Stopped).await);
    assert!(wait::until(TIMEOUT, || control.position() == Duration::ZERO).await);

    Ok(())
}

#[tokio::test]
async fn test_render_loop_drains_only_when_pumped() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::RenderLoop, clocked(10_000))?;
    let control = &sim.control;

    control.set_media(MediaContent::new("sim://clip"));
    control.play();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(control.media_status(), MediaStatus::NoMedia);

    control.on_before_rendering();
    assert_eq!(control.state(), PlayerState::Playing);

    // Clock notifications pile up until the next frame
    let before = control.position();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(control.position(), before);
    assert!(sim.processor.position() > before);

    assert!(control.on_before_rendering() > 0);
    assert!(control.position() > before);

    Ok(())
}

#[tokio::test]
async fn test_commands_apply_in_order() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, SimulatedConfig::default())?;
    let control = &sim.control;

    control.set_media(MediaContent::new("sim://first"));
    control.play();
    control.set_media(MediaContent::new("sim://second"));
    control.set_position(Duration::from_secs(4));

    assert!(wait::until(TIMEOUT, || control.position() == Duration::from_secs(4)).await);
    assert_eq!(control.state(), PlayerState::Stopped);
    assert_eq!(control.media_status(), MediaStatus::Loaded);
    assert_eq!(control.media(), MediaContent::new("sim://second"));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_producers() -> Result<()> {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 200;

    let sim = SimulatedControl::new(ConsumerMode::Dedicated, SimulatedConfig::default())?;
    let control = Arc::new(sim.control);
    control.set_media(MediaContent::new("sim://clip"));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|i| {
            let control = Arc::clone(&control);
            thread::spawn(move || {
                for n in 0..PER_PRODUCER {
                    match (i + n) % 3 {
                        0 => control.play(),
                        1 => control.pause(),
                        _ => control.set_position(Duration::from_millis(n as u64)),
                    }
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer panicked");
    }

    let total = (PRODUCERS * PER_PRODUCER + 1) as u64;
    assert!(wait::until(TIMEOUT, || control.stats().commands_processed == total).await);
    assert_eq!(control.pending_commands(), 0);

    let stats = control.stats();
    assert_eq!(stats.commands_failed, 0);
    assert!(stats.batches <= total);

    Ok(())
}

#[tokio::test]
async fn test_pending_seek_applied_on_load() -> Result<()> {
    let sim = SimulatedControl::new(
        ConsumerMode::Dedicated,
        SimulatedConfig {
            report_ready: false,
            ..Default::default()
        },
    )?;
    let control = &sim.control;

    control.set_media(MediaContent::new("sim://slow"));
    control.set_position(Duration::from_secs(2));
    assert!(wait::until(TIMEOUT, || control.media_status() == MediaStatus::Loading).await);
    assert_eq!(control.position(), Duration::ZERO);

    let load = sim.processor.current_load().expect("media opened");
    control.notification_sink().notify(Notification::MediaReady {
        load,
        duration: Duration::from_secs(10),
        seekable: true,
        has_audio: true,
        has_video: true,
    });

    assert!(wait::until(TIMEOUT, || control.position() == Duration::from_secs(2)).await);
    assert_eq!(sim.processor.position(), Duration::from_secs(2));

    Ok(())
}

#[tokio::test]
async fn test_error_handling() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, SimulatedConfig::default())?;
    let control = &sim.control;
    let events = control.subscribe();

    control.set_media(MediaContent::new("/non/existent/file.mp4"));
    let error = wait::for_event(&events, TIMEOUT, |e| matches!(e, PlayerEvent::Error { .. })).await;
    assert!(error.is_some());
    assert_eq!(control.media_status(), MediaStatus::InvalidMedia);
    assert_eq!(control.state(), PlayerState::Stopped);

    // Recover with a good media
    control.set_media(MediaContent::new("sim://fine"));
    assert!(wait::until(TIMEOUT, || control.media_status() == MediaStatus::Loaded).await);

    Ok(())
}

#[tokio::test]
async fn test_pipeline_failure_notification() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, SimulatedConfig::default())?;
    let control = &sim.control;

    control.set_media(MediaContent::new("sim://clip"));
    control.play();
    assert!(wait::until(TIMEOUT, || control.state() == PlayerState::Playing).await);

    control
        .notification_sink()
        .notify(Notification::Failed("device lost".to_string()));
    assert!(wait::until(TIMEOUT, || control.media_status() == MediaStatus::InvalidMedia).await);
    assert_eq!(control.state(), PlayerState::Stopped);

    Ok(())
}

#[tokio::test]
async fn test_texture_handles_are_unique() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::RenderLoop, SimulatedConfig::default())?;
    let control = &sim.control;
    control.on_scene_graph_initialized();

    let mut seen = HashSet::new();
    for _ in 0..5 {
        let handle = control.instantiate_texture(FrameSize::new(64, 64))?;
        assert!(seen.insert(handle));
    }
    assert_eq!(sim.textures.live_textures(), 5);

    control.on_before_rendering();
    assert_eq!(sim.textures.live_textures(), 1);
    assert_eq!(sim.textures.bytes_allocated(), 64 * 64 * 4);

    Ok(())
}

#[tokio::test]
async fn test_stop_invalidates_announced_texture() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::RenderLoop, SimulatedConfig::default())?;
    let control = &sim.control;
    let events = control.subscribe();

    control.on_scene_graph_initialized();
    let handle = control.instantiate_texture(FrameSize::new(32, 32))?;
    control.set_media(MediaContent::new("sim://clip"));
    control.play();
    control.on_before_rendering();
    assert!(events.try_iter().any(|e| e == PlayerEvent::TextureReady(handle)));

    control.stop();
    control.on_before_rendering();
    assert!(events
        .try_iter()
        .any(|e| e == PlayerEvent::TextureInvalidated(handle)));

    // The texture itself stays allocated until freed
    assert_eq!(control.live_texture(), Some(handle));
    assert!(control.free_texture(handle));
    control.on_before_rendering();
    assert_eq!(sim.textures.live_textures(), 0);

    Ok(())
}

#[tokio::test]
async fn test_every_texture_released_exactly_once() -> Result<()> {
    let mut provider = mocks::MockProvider::new();
    let mut next = 0;
    provider.expect_instantiate().times(3).returning(move |size| {
        next += 1;
        Ok(TextureData::new(TextureHandle(next), size))
    });
    for id in 1..=3 {
        provider
            .expect_release()
            .withf(move |t| t.handle() == TextureHandle(id))
            .times(1)
            .return_const(());
    }

    let control = PlayerControlBuilder::new()
        .with_config(ControlConfig {
            consumer_mode: ConsumerMode::RenderLoop,
            ..Default::default()
        })
        .with_processor(Box::new(mocks::processor()))
        .with_texture_provider(Box::new(provider))
        .build()?;
    control.on_scene_graph_initialized();

    let first = control.instantiate_texture(FrameSize::new(8, 8))?;
    control.instantiate_texture(FrameSize::new(8, 8))?;
    assert!(!control.free_texture(first));
    control.on_before_rendering();
    control.instantiate_texture(FrameSize::new(8, 8))?;

    // Displaced texture and live texture are released during teardown
    drop(control);

    Ok(())
}

#[tokio::test]
async fn test_processor_sees_transport_calls_in_order() -> Result<()> {
    let mut processor = mocks::processor();
    let mut seq = Sequence::new();
    processor
        .expect_set_media()
        .withf(|m, _| m.uri() == "sim://ordered")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    processor
        .expect_play()
        .with(eq(FrameSize::new(640, 360)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    processor
        .expect_pause()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    processor
        .expect_stop()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));

    let control = PlayerControlBuilder::new()
        .with_config(ControlConfig {
            consumer_mode: ConsumerMode::RenderLoop,
            ..Default::default()
        })
        .with_processor(Box::new(processor))
        .build()?;

    control.set_frame_size(FrameSize::new(640, 360))?;
    control.set_media(MediaContent::new("sim://ordered"));
    control.pause();
    control.play();
    control.play();
    control.pause();
    control.stop();
    control.stop();
    control.process_pending_commands();

    assert_eq!(control.state(), PlayerState::Stopped);
    assert_eq!(control.media_status(), MediaStatus::Loading);
    assert_eq!(control.stats().commands_rejected, 2);

    Ok(())
}

#[tokio::test]
async fn test_invalid_media_never_reaches_play() -> Result<()> {
    let mut processor = mocks::processor();
    processor
        .expect_set_media()
        .times(1)
        .returning(|m, _| Err(PlayerError::invalid_media(m.uri().to_string())));
    processor.expect_play().never();

    let control = PlayerControlBuilder::new()
        .with_config(ControlConfig {
            consumer_mode: ConsumerMode::RenderLoop,
            ..Default::default()
        })
        .with_processor(Box::new(processor))
        .build()?;

    control.set_media(MediaContent::new("bogus://"));
    control.play();
    control.process_pending_commands();

    assert_eq!(control.media_status(), MediaStatus::InvalidMedia);
    assert_eq!(control.stats().commands_failed, 1);
    assert_eq!(control.stats().commands_rejected, 1);

    Ok(())
}

#[tokio::test]
async fn test_ready_report_for_replaced_media_is_ignored() -> Result<()> {
    let (loads_tx, loads) = crossbeam_channel::unbounded();
    let mut processor = mocks::processor();
    processor
        .expect_set_media()
        .times(2)
        .returning(move |_, load| {
            let _ = loads_tx.send(load);
            Ok(())
        });

    let control = PlayerControlBuilder::new()
        .with_config(ControlConfig {
            consumer_mode: ConsumerMode::RenderLoop,
            ..Default::default()
        })
        .with_processor(Box::new(processor))
        .build()?;
    let sink = control.notification_sink();
    let ready = |load: LoadId, secs: u64| Notification::MediaReady {
        load,
        duration: Duration::from_secs(secs),
        seekable: true,
        has_audio: true,
        has_video: true,
    };

    control.set_media(MediaContent::new("sim://first"));
    control.process_pending_commands();
    let first = loads.try_recv()?;

    // The first media reports in only after it has been replaced
    control.set_media(MediaContent::new("sim://second"));
    sink.notify(ready(first, 99));
    control.process_pending_commands();
    let second = loads.try_recv()?;

    assert_ne!(first, second);
    assert_eq!(control.media_status(), MediaStatus::Loading);
    assert_eq!(control.duration(), Duration::ZERO);

    sink.notify(ready(second, 5));
    control.process_pending_commands();
    assert_eq!(control.media_status(), MediaStatus::Loaded);
    assert_eq!(control.duration(), Duration::from_secs(5));

    Ok(())
}

#[tokio::test]
async fn test_consumer_mode_from_config_file() -> Result<()> {
    let fixture = TestFixture::new()?;
    let path = fixture.path().join("config.toml");
    std::fs::write(
        &path,
        "[control]\nconsumer_mode = \"render-loop\"\nauto_play = true\n",
    )?;
    let config = Config::from_file(&path)?;

    let control = PlayerControlBuilder::new()
        .with_config(config.control)
        .with_processor(Box::new(playctl::decoder::SimulatedProcessor::new(
            SimulatedConfig::default(),
        )))
        .with_texture_provider(Box::new(HeapTextureProvider::new()))
        .build()?;
    assert_eq!(control.consumer_mode(), ConsumerMode::RenderLoop);

    control.set_media(MediaContent::new("sim://auto"));
    control.on_before_rendering();
    assert_eq!(control.state(), PlayerState::Playing);

    Ok(())
}

#[tokio::test]
async fn test_resource_cleanup() -> Result<()> {
    let sim = SimulatedControl::new(ConsumerMode::Dedicated, clocked(10_000))?;
    let textures = sim.textures.clone();
    let control = sim.control;

    control.on_scene_graph_initialized();
    control.instantiate_texture(FrameSize::new(16, 16))?;
    control.instantiate_texture(FrameSize::new(16, 16))?;
    control.set_media(MediaContent::new("sim://clip"));
    control.play();
    assert!(wait::until(TIMEOUT, || control.position() > Duration::ZERO).await);

    drop(control);
    assert_eq!(textures.live_textures(), 0);
    let (allocated, released) = textures.counters();
    assert_eq!(allocated, released);

    Ok(())
}
