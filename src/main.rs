use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};
use std::path::PathBuf;
use std::time::Duration;

use playctl::decoder::{SimulatedConfig, SimulatedProcessor};
use playctl::player::{PlayerControlBuilder, PlayerEvent, PlayerEventHandler};
use playctl::renderer::HeapTextureProvider;
use playctl::utils::{format_progress, load_config, ConsumerMode};
use playctl::{FrameSize, MediaContent, MediaStatus, PlayerState};

/// playctl - drive the playback control surface against a simulated decoder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Media to play: a `sim://name` URI or an existing file path
    #[arg(value_name = "MEDIA", default_value = "sim://demo")]
    media: String,

    /// Set initial volume (0-100)
    #[arg(short, long, value_name = "VOLUME")]
    volume: Option<u8>,

    /// Frame width
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Frame height
    #[arg(long, default_value = "720")]
    height: u32,

    /// Consumer context: dedicated or render-loop
    #[arg(short, long, value_name = "MODE")]
    mode: Option<ConsumerMode>,

    /// Simulated media length in seconds
    #[arg(long, default_value = "5")]
    duration: u64,

    /// Simulated decode and render rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Print status lines as JSON snapshots
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    // Initialize logging
    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting playctl v{}", env!("CARGO_PKG_VERSION"));

    if let Some(mode) = args.mode {
        config.control.consumer_mode = mode;
    }
    if let Some(volume) = args.volume {
        config.control.initial_volume = f32::from(volume.min(100)) / 100.0;
    }
    let frame_size = FrameSize::new(args.width, args.height);
    config.control.default_frame_size = frame_size;

    let fps = args.fps.max(1);
    let frame_interval = Duration::from_secs(1) / fps;
    let processor = SimulatedProcessor::new(SimulatedConfig {
        duration: Duration::from_secs(args.duration),
        frame_interval: Some(frame_interval),
        ..Default::default()
    });
    let textures = HeapTextureProvider::new();

    let control = PlayerControlBuilder::new()
        .with_config(config.control.clone())
        .with_processor(Box::new(processor))
        .with_texture_provider(Box::new(textures.clone()))
        .with_event_handler(Box::new(LoggingEventHandler))
        .build()?;
    let events = control.subscribe();

    // The render side comes up first, then asks for its texture
    control.on_scene_graph_initialized();
    let mut texture = Some(control.instantiate_texture(frame_size)?);

    control.set_media(MediaContent::new(args.media.as_str()));
    control.play();

    let mut render_tick = tokio::time::interval(frame_interval);
    let mut status_tick = tokio::time::interval(Duration::from_secs(1));
    let mut frames_drawn: u64 = 0;

    loop {
        tokio::select! {
            _ = render_tick.tick() => {
                control.on_before_rendering();

                for event in events.try_iter() {
                    match event {
                        PlayerEvent::TextureReady(handle) => {
                            if textures.with_pixels(handle, |pixels| pixels[0] = pixels[0].wrapping_add(1)) {
                                frames_drawn += 1;
                            }
                        }
                        PlayerEvent::TextureInvalidated(handle) => {
                            debug!("Render side dropped {}", handle);
                            if texture == Some(handle) {
                                texture = None;
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ = status_tick.tick() => {
                if args.json {
                    println!("{}", serde_json::to_string(&control.snapshot())?);
                } else {
                    println!(
                        "{:?}/{:?} {}",
                        control.state(),
                        control.media_status(),
                        format_progress(control.position(), control.duration()),
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                control.stop();
                break;
            }
        }

        match control.media_status() {
            MediaStatus::EndOfMedia if control.state() == PlayerState::Stopped => break,
            MediaStatus::InvalidMedia => {
                error!("Cannot play {}", args.media);
                break;
            }
            _ => {}
        }
    }

    if let Some(handle) = texture {
        control.free_texture(handle);
    }
    control.process_pending_commands();

    let stats = control.stats();
    info!(
        "Drew {} frame(s); {} command(s) in {} batch(es), {} rejected, {} failed",
        frames_drawn,
        stats.commands_processed,
        stats.batches,
        stats.commands_rejected,
        stats.commands_failed
    );
    drop(control);

    let (allocated, released) = textures.counters();
    info!("Textures allocated: {}, released: {}", allocated, released);
    Ok(())
}

/// Event handler that logs events
struct LoggingEventHandler;

impl PlayerEventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::PositionChanged(position) => {
                // Log position changes at debug level to avoid spam
                debug!("Position: {:?}", position);
            }
            PlayerEvent::StateChanged(state) => info!("State: {:?}", state),
            PlayerEvent::MediaStatusChanged(status) => info!("Media status: {:?}", status),
            PlayerEvent::VolumeChanged(volume) => info!("Volume: {:.0}%", volume * 100.0),
            PlayerEvent::PlaybackRateChanged(rate) => info!("Playback speed: {:.1}x", rate),
            PlayerEvent::Error { message } => error!("Player error: {}", message),
            _ => {}
        }
    }
}
