use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while producing and publishing a post
#[derive(Error, Debug)]
pub enum CowpostError {
    /// The external command chain failed or produced nothing usable
    #[error("Generator command failed: {0}")]
    PipelineError(String),

    /// Font loading, rasterization or image encoding failed
    #[error("Render error: {0}")]
    RenderError(String),

    /// The session could not be created
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The blob upload was rejected or could not be sent
    #[error("Upload failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    UploadError {
        status: Option<u16>,
        message: String,
        payload_too_large: bool,
    },

    /// The post record could not be created
    #[error("Publish failed: {0}")]
    PublishError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Error when writing an output file
    #[error("Failed to write file {path}: {message}")]
    FileWriteError { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CowpostError {
    /// Short stage label, used in logs
    pub fn stage(&self) -> &'static str {
        match self {
            CowpostError::PipelineError(_) => "generate",
            CowpostError::RenderError(_) => "render",
            CowpostError::AuthError(_) => "auth",
            CowpostError::UploadError { .. } => "upload",
            CowpostError::PublishError(_) => "publish",
            CowpostError::ConfigurationError(_) => "config",
            CowpostError::FileWriteError { .. } | CowpostError::IoError(_) => "io",
        }
    }
}

/// Type alias for Result with `CowpostError`
pub type Result<T> = std::result::Result<T, CowpostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_display() {
        let err = CowpostError::UploadError {
            status: Some(413),
            message: "blob too big".to_string(),
            payload_too_large: true,
        };
        assert_eq!(err.to_string(), "Upload failed (HTTP 413): blob too big");

        let err = CowpostError::UploadError {
            status: None,
            message: "connection refused".to_string(),
            payload_too_large: false,
        };
        assert_eq!(err.to_string(), "Upload failed: connection refused");
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(CowpostError::PipelineError(String::new()).stage(), "generate");
        assert_eq!(CowpostError::AuthError(String::new()).stage(), "auth");
        assert_eq!(CowpostError::PublishError(String::new()).stage(), "publish");
    }
}
