//! Text generation
//!
//! A [`TextGenerator`] produces the ANSI-colored text that gets rendered.
//! [`ShellGenerator`] runs an external command chain such as
//! `fortune | cowsay | lolcat -f`; [`StaticGenerator`] returns fixed text.

mod shell;

use async_trait::async_trait;

use crate::ansi::strip_ansi_codes;
use crate::errors::{CowpostError, Result};

pub use shell::{force_lolcat_color, ShellGenerator};

/// Maximum alt text length accepted by the image embed
pub const MAX_ALT_TEXT_CHARS: usize = 1000;

/// Generator output: the colored text and its plain counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    /// Text with ANSI escape sequences
    pub raw: String,
    /// Text with escape sequences removed
    pub plain: String,
}

impl GeneratedText {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let plain = strip_ansi_codes(&raw);
        Self { raw, plain }
    }

    /// Plain text trimmed and cut to the alt text limit
    pub fn alt_text(&self) -> String {
        self.plain.trim().chars().take(MAX_ALT_TEXT_CHARS).collect()
    }
}

/// Source of ANSI-colored text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce one piece of text
    async fn generate(&self) -> Result<GeneratedText>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

/// Generator returning a fixed string
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    text: String,
}

impl StaticGenerator {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TextGenerator for StaticGenerator {
    async fn generate(&self) -> Result<GeneratedText> {
        if self.text.is_empty() {
            return Err(CowpostError::PipelineError(
                "Generator command produced empty output.".to_string(),
            ));
        }
        Ok(GeneratedText::from_raw(self.text.clone()))
    }

    fn describe(&self) -> String {
        format!("static text ({} bytes)", self.text.len())
    }
}
