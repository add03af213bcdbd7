//! External command chain generator

use std::env;
use std::process::Stdio;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use super::{GeneratedText, TextGenerator};
use crate::ansi::contains_ansi;
use crate::errors::{CowpostError, Result};

lazy_static! {
    static ref LOLCAT_WORD: Regex = Regex::new(r"\blolcat\b").expect("lolcat regex is valid");
    static ref LOLCAT_FORCED: Regex =
        Regex::new(r"\blolcat\b\s+(-f|--force)\b").expect("lolcat force regex is valid");
}

/// Make sure a `lolcat` stage emits color even though stdout is a pipe
///
/// The first `lolcat` without `-f`/`--force` gets `-f` added. Commands
/// without `lolcat` are returned unchanged.
pub fn force_lolcat_color(command: &str) -> String {
    if LOLCAT_WORD.is_match(command) && !LOLCAT_FORCED.is_match(command) {
        LOLCAT_WORD.replace(command, "lolcat -f").into_owned()
    } else {
        command.to_string()
    }
}

/// Runs a command line through a shell and captures its stdout
#[derive(Debug, Clone)]
pub struct ShellGenerator {
    command: String,
    shell: String,
    login: bool,
}

impl ShellGenerator {
    /// Generator for `command`, run with `bash -lc`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: force_lolcat_color(&command.into()),
            shell: "bash".to_string(),
            login: true,
        }
    }

    /// Use another shell binary
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Whether to start the shell as a login shell
    pub fn login(mut self, login: bool) -> Self {
        self.login = login;
        self
    }

    /// The command line after color forcing
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Script handed to the shell; a failing stage anywhere in a pipe fails the run
    fn script(&self) -> String {
        format!("set -o pipefail; {}", self.command)
    }

    fn build_command(&self) -> Command {
        let flag = if self.login { "-lc" } else { "-c" };
        let mut cmd = Command::new(&self.shell);
        cmd.arg(flag)
            .arg(self.script())
            .env(
                "TERM",
                env::var("TERM").unwrap_or_else(|_| "xterm-256color".to_string()),
            )
            .env(
                "COLORTERM",
                env::var("COLORTERM").unwrap_or_else(|_| "truecolor".to_string()),
            )
            .env("CLICOLOR_FORCE", "1")
            .env("FORCE_COLOR", "3")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl TextGenerator for ShellGenerator {
    #[instrument(level = "debug", skip(self), fields(command = %self.command))]
    async fn generate(&self) -> Result<GeneratedText> {
        debug!("Running generator with {}", self.shell);

        let output = self.build_command().output().await.map_err(|e| {
            CowpostError::PipelineError(format!("Failed to spawn {}: {}", self.shell, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                "unknown error".to_string()
            } else {
                stderr
            };
            return Err(CowpostError::PipelineError(format!(
                "{} (exit status: {})",
                detail, output.status
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout).into_owned();
        if raw.is_empty() {
            return Err(CowpostError::PipelineError(
                "Generator command produced empty output.".to_string(),
            ));
        }
        if LOLCAT_WORD.is_match(&self.command) && !contains_ansi(&raw) {
            return Err(CowpostError::PipelineError(
                "No ANSI color codes produced by lolcat. Check if lolcat is installed and supports -f."
                    .to_string(),
            ));
        }

        info!("Generator produced {} bytes", raw.len());
        Ok(GeneratedText::from_raw(raw))
    }

    fn describe(&self) -> String {
        format!("{} -c '{}'", self.shell, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(command: &str) -> ShellGenerator {
        ShellGenerator::new(command).with_shell("bash").login(false)
    }

    #[test]
    fn test_force_lolcat_color() {
        assert_eq!(
            force_lolcat_color("fortune | cowsay | lolcat"),
            "fortune | cowsay | lolcat -f"
        );
        assert_eq!(
            force_lolcat_color("fortune | cowsay | lolcat -f"),
            "fortune | cowsay | lolcat -f"
        );
        assert_eq!(
            force_lolcat_color("fortune | lolcat --force -p 2"),
            "fortune | lolcat --force -p 2"
        );
        assert_eq!(
            force_lolcat_color("cowsay moo | lolcat -p 3"),
            "cowsay moo | lolcat -f -p 3"
        );
        assert_eq!(force_lolcat_color("fortune | cowsay"), "fortune | cowsay");
        assert_eq!(force_lolcat_color("echo lolcats"), "echo lolcats");
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let text = sh("printf '\\033[31mmoo\\033[0m\\n'").generate().await.unwrap();
        assert_eq!(text.raw, "\x1b[31mmoo\x1b[0m\n");
        assert_eq!(text.plain, "moo\n");
    }

    #[tokio::test]
    async fn test_forces_color_environment() {
        let text = sh("printf '%s %s' \"$CLICOLOR_FORCE\" \"$FORCE_COLOR\"")
            .generate()
            .await
            .unwrap();
        assert_eq!(text.raw, "1 3");
    }

    #[tokio::test]
    async fn test_empty_output_is_pipeline_error() {
        let err = sh("true").generate().await.unwrap_err();
        assert!(matches!(err, CowpostError::PipelineError(_)));
        assert!(err.to_string().contains("empty output"));
    }

    #[tokio::test]
    async fn test_failing_stage_is_pipeline_error() {
        let err = sh("echo moo; echo 'no fortune today' >&2; exit 3")
            .generate()
            .await
            .unwrap_err();
        assert!(matches!(err, CowpostError::PipelineError(_)));
        assert!(err.to_string().contains("no fortune today"));
    }

    #[tokio::test]
    async fn test_failing_early_stage_is_pipeline_error() {
        let err = sh("false | echo moo").generate().await.unwrap_err();
        assert!(matches!(err, CowpostError::PipelineError(_)));

        let err = sh("exit 7 | cat | cat").generate().await.unwrap_err();
        assert!(err.to_string().contains("exit status: 7"));
    }

    #[test]
    fn test_script_enables_pipefail() {
        let generator = ShellGenerator::new("fortune | cowsay");
        assert_eq!(generator.script(), "set -o pipefail; fortune | cowsay");
    }

    #[tokio::test]
    async fn test_missing_shell_is_pipeline_error() {
        let err = ShellGenerator::new("echo moo")
            .with_shell("/nonexistent/shell")
            .generate()
            .await
            .unwrap_err();
        assert!(matches!(err, CowpostError::PipelineError(_)));
    }
}
