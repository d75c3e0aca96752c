//! Utility module for playctl
//!
//! Error types, configuration, and the small helpers the demo binary uses.

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{Config, ConsumerMode, ControlConfig, GeneralConfig};
pub use error::{IntoPlayerError, PlayerError, Result};

use std::path::Path;
use std::time::Duration;

/// Load the configuration the binary runs with
///
/// An explicit file is read as-is and validated. Without one the usual
/// chain applies: defaults, system file, user file, `PLAYCTL_*` variables.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let config = Config::from_file(path)?;
            config.validate()?;
            Ok(config)
        }
        None => Config::load(),
    }
}

/// Render `position / duration` as a status line clock
///
/// Both sides get an hours field once the media runs an hour or longer, so
/// the line keeps its width while playing.
pub fn format_progress(position: Duration, duration: Duration) -> String {
    let with_hours = duration.as_secs() >= 3600 || position.as_secs() >= 3600;
    format!(
        "{} / {}",
        clock(position, with_hours),
        clock(duration, with_hours)
    )
}

fn clock(t: Duration, with_hours: bool) -> String {
    let secs = t.as_secs();
    if with_hours {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else {
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
