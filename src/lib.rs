//! # cowpost
//!
//! Turns the colored output of `fortune | cowsay | lolcat` into a PNG and
//! posts it to Bluesky with the plain text as alt text. One run makes one
//! post; scheduling is left to a systemd timer (see [`install`]).

pub mod ansi;
pub mod bluesky;
pub mod config;
pub mod errors;
pub mod generator;
pub mod install;
pub mod pipeline;
pub mod render;

pub use config::Config;
pub use errors::{CowpostError, Result};
pub use generator::{GeneratedText, ShellGenerator, StaticGenerator, TextGenerator};
pub use pipeline::{run, RunReport};
