//! Runtime configuration
//!
//! Built once at startup from the process environment, falling back to a
//! `.env` file in the working directory, and then passed down explicitly.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ansi::Rgb;
use crate::errors::{CowpostError, Result};
use crate::render::RenderOptions;

pub const DEFAULT_PDS_HOST: &str = "https://bsky.social";
pub const DEFAULT_POST_TEXT: &str = "cowsay";
pub const DEFAULT_GENERATOR: &str = "fortune | cowsay | lolcat -f";
pub const DEFAULT_DEBUG_IMAGE: &str = "last_cowsay.png";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Configuration for one posting run
#[derive(Clone)]
pub struct Config {
    /// Account handle or DID
    pub identifier: String,
    /// App password for the account
    pub app_password: String,
    /// Base URL of the personal data server
    pub pds_host: String,
    /// Caption of the post
    pub post_text: String,
    /// Shell command line producing ANSI text
    pub generator_cmd: String,
    /// Font and color settings for the renderer
    pub render: RenderOptions,
    /// Where the rendered PNG is written on every run
    pub debug_image: PathBuf,
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
}

// Keep the app password out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("identifier", &self.identifier)
            .field("app_password", &"<redacted>")
            .field("pds_host", &self.pds_host)
            .field("post_text", &self.post_text)
            .field("generator_cmd", &self.generator_cmd)
            .field("render", &self.render)
            .field("debug_image", &self.debug_image)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Config {
    /// Create configuration from environment variables and `./.env`
    pub fn from_env() -> Result<Self> {
        let file_values = load_env_file(Path::new(".env"))?;
        Self::from_lookup(|key| env::var(key).ok().or_else(|| file_values.get(key).cloned()))
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let identifier = get("BSKY_IDENTIFIER").unwrap_or_else(|| {
            missing.push("BSKY_IDENTIFIER");
            String::new()
        });
        let app_password = get("BSKY_APP_PASSWORD").unwrap_or_else(|| {
            missing.push("BSKY_APP_PASSWORD");
            String::new()
        });
        if !missing.is_empty() {
            return Err(CowpostError::ConfigurationError(format!(
                "Missing required config: {}. Set .env or environment variables.",
                missing.join(", ")
            )));
        }

        let pds_host = get("BSKY_PDS_HOST")
            .unwrap_or_else(|| DEFAULT_PDS_HOST.to_string())
            .trim_end_matches('/')
            .to_string();
        let post_text = get("BSKY_POST_TEXT").unwrap_or_else(|| DEFAULT_POST_TEXT.to_string());
        let generator_cmd =
            get("COWSAY_GENERATOR").unwrap_or_else(|| DEFAULT_GENERATOR.to_string());

        let defaults = RenderOptions::default();
        let render = RenderOptions {
            font_path: get("BSKY_FONT_PATH").map(PathBuf::from),
            font_size: match get("BSKY_FONT_SIZE") {
                Some(size) => size.trim().parse().map_err(|_| {
                    CowpostError::ConfigurationError(format!("Invalid BSKY_FONT_SIZE: {}", size))
                })?,
                None => defaults.font_size,
            },
            foreground: match get("BSKY_FG_COLOR") {
                Some(fg) => parse_color("BSKY_FG_COLOR", &fg)?,
                None => defaults.foreground,
            },
            background: match get("BSKY_BG_COLOR") {
                Some(bg) => parse_color("BSKY_BG_COLOR", &bg)?,
                None => defaults.background,
            },
        };

        let debug_image = get("BSKY_DEBUG_IMAGE")
            .map_or_else(|| PathBuf::from(DEFAULT_DEBUG_IMAGE), PathBuf::from);

        let timeout_seconds = match get("BSKY_TIMEOUT_SECONDS") {
            Some(value) => value.trim().parse().map_err(|_| {
                CowpostError::ConfigurationError(format!("Invalid BSKY_TIMEOUT_SECONDS: {}", value))
            })?,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        let config = Self {
            identifier,
            app_password,
            pds_host,
            post_text,
            generator_cmd,
            render,
            debug_image,
            timeout_seconds,
        };
        config.validate()?;

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.render.font_size == 0 || self.render.font_size > 200 {
            return Err(CowpostError::ConfigurationError(
                "Font size must be between 1 and 200".to_string(),
            ));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(CowpostError::ConfigurationError(
                "Timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if !(self.pds_host.starts_with("https://") || self.pds_host.starts_with("http://")) {
            return Err(CowpostError::ConfigurationError(format!(
                "BSKY_PDS_HOST must be an http(s) URL, got {}",
                self.pds_host
            )));
        }

        if self.generator_cmd.trim().is_empty() {
            return Err(CowpostError::ConfigurationError(
                "Generator command cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_color(key: &str, value: &str) -> Result<Rgb> {
    Rgb::parse_hex(value).ok_or_else(|| {
        CowpostError::ConfigurationError(format!("Invalid {}: {} (expected #rrggbb)", key, value))
    })
}

/// Parse a simple `KEY=VALUE` file
///
/// Blank lines, `#` comments and lines without `=` are skipped. Surrounding
/// quotes are removed from values. A missing file yields an empty map.
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(path)?;
    Ok(parse_env_content(&content))
}

fn parse_env_content(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}
