//! systemd user unit generation
//!
//! Scheduling is left to the host: a oneshot service runs the binary once and
//! a timer triggers it every N minutes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{CowpostError, Result};

pub const SERVICE_NAME: &str = "cowpost.service";
pub const TIMER_NAME: &str = "cowpost.timer";
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// Parameters of the generated units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOptions {
    /// Minutes between runs
    pub interval_minutes: u32,
    /// Absolute path of the `cowpost` binary
    pub binary: PathBuf,
    /// Directory holding `.env`; the debug image is written here too
    pub working_dir: PathBuf,
}

impl UnitOptions {
    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(CowpostError::ConfigurationError(
                "Interval must be at least 1 minute".to_string(),
            ));
        }
        if !self.binary.is_absolute() || !self.working_dir.is_absolute() {
            return Err(CowpostError::ConfigurationError(
                "Binary and working directory must be absolute paths".to_string(),
            ));
        }
        Ok(())
    }
}

/// Oneshot service that posts once
pub fn render_service(options: &UnitOptions) -> String {
    let working_dir = options.working_dir.display();
    format!(
        "[Unit]\n\
         Description=Post a cowsay image to Bluesky\n\
         Wants=network-online.target\n\
         After=network-online.target\n\
         \n\
         [Service]\n\
         Type=oneshot\n\
         WorkingDirectory={working_dir}\n\
         EnvironmentFile=-{working_dir}/.env\n\
         ExecStart={binary}\n",
        working_dir = working_dir,
        binary = options.binary.display(),
    )
}

/// Periodic trigger for the service
pub fn render_timer(options: &UnitOptions) -> String {
    format!(
        "[Unit]\n\
         Description=Run {service} every {minutes} minutes\n\
         \n\
         [Timer]\n\
         OnBootSec=2min\n\
         OnUnitActiveSec={minutes}min\n\
         Persistent=true\n\
         Unit={service}\n\
         \n\
         [Install]\n\
         WantedBy=timers.target\n",
        service = SERVICE_NAME,
        minutes = options.interval_minutes,
    )
}

/// Default location for user units (`~/.config/systemd/user`)
pub fn default_unit_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("systemd").join("user"))
}

/// Write both units into `dir`, returning the written paths
pub fn write_units(options: &UnitOptions, dir: &Path) -> Result<Vec<PathBuf>> {
    options.validate()?;
    fs::create_dir_all(dir)?;

    let units = [
        (SERVICE_NAME, render_service(options)),
        (TIMER_NAME, render_timer(options)),
    ];

    let mut written = Vec::with_capacity(units.len());
    for (name, content) in units {
        let path = dir.join(name);
        fs::write(&path, content).map_err(|e| CowpostError::FileWriteError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Commands that activate the timer after the units are written
pub fn activation_commands() -> [String; 2] {
    [
        "systemctl --user daemon-reload".to_string(),
        format!("systemctl --user enable --now {}", TIMER_NAME),
    ]
}
