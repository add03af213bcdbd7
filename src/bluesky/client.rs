//! XRPC client for the three calls a post needs

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use tracing::{debug, error, info};

use crate::bluesky::{
    BlobRef, CreateSessionRequest, PostDraft, PostRef, Session, UploadBlobResponse, XrpcError,
};
use crate::errors::{CowpostError, Result};

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const UPLOAD_BLOB: &str = "com.atproto.repo.uploadBlob";
const CREATE_RECORD: &str = "com.atproto.repo.createRecord";

/// HTTP client bound to one personal data server
///
/// Every call is a single attempt; failures surface to the caller as is.
#[derive(Debug, Clone)]
pub struct BlueskyClient {
    host: String,
    client: reqwest::Client,
}

impl BlueskyClient {
    /// Create a client for `host` (e.g. `https://bsky.social`)
    pub fn new(host: &str, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("cowpost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                CowpostError::ConfigurationError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.host, method)
    }

    /// Authenticate with a handle (or DID) and app password
    pub async fn create_session(&self, identifier: &str, app_password: &str) -> Result<Session> {
        let url = self.xrpc_url(CREATE_SESSION);
        debug!("Creating session for {} at {}", identifier, url);

        let response = self
            .client
            .post(&url)
            .json(&CreateSessionRequest {
                identifier,
                password: app_password,
            })
            .send()
            .await
            .map_err(|e| CowpostError::AuthError(format!("Network error calling {}: {}", url, e)))?;

        let response = check_status(response, &url)
            .await
            .map_err(|(status, message)| {
                CowpostError::AuthError(format!("HTTP {} from {}: {}", status.as_u16(), url, message))
            })?;

        let session: Session = response.json().await.map_err(|e| {
            CowpostError::AuthError(format!("Malformed createSession response: {}", e))
        })?;

        info!("Authenticated as {} ({})", session.handle, session.did);
        Ok(session)
    }

    /// Upload PNG bytes and return the blob descriptor
    pub async fn upload_blob(&self, session: &Session, png: Vec<u8>) -> Result<BlobRef> {
        let url = self.xrpc_url(UPLOAD_BLOB);
        let size = png.len();
        debug!("Uploading {} bytes to {}", size, url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", session.access_jwt))
            .header(CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .await
            .map_err(|e| CowpostError::UploadError {
                status: None,
                message: format!("Network error calling {}: {}", url, e),
                payload_too_large: false,
            })?;

        let response = check_status(response, &url)
            .await
            .map_err(|(status, message)| CowpostError::UploadError {
                status: Some(status.as_u16()),
                message,
                payload_too_large: status == StatusCode::PAYLOAD_TOO_LARGE,
            })?;

        let uploaded: UploadBlobResponse =
            response.json().await.map_err(|e| CowpostError::UploadError {
                status: None,
                message: format!("Malformed uploadBlob response: {}", e),
                payload_too_large: false,
            })?;

        let blob = uploaded.blob.ok_or_else(|| CowpostError::UploadError {
            status: None,
            message: "uploadBlob response missing blob field.".to_string(),
            payload_too_large: false,
        })?;

        info!("Uploaded blob {} ({} bytes)", blob.reference.link, blob.size);
        Ok(blob)
    }

    /// Create the post record in the session's repo
    pub async fn create_post(&self, session: &Session, draft: &PostDraft) -> Result<PostRef> {
        let url = self.xrpc_url(CREATE_RECORD);
        debug!("Creating post record in {}", session.did);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", session.access_jwt))
            .json(&draft.to_request(&session.did))
            .send()
            .await
            .map_err(|e| {
                CowpostError::PublishError(format!("Network error calling {}: {}", url, e))
            })?;

        let response = check_status(response, &url)
            .await
            .map_err(|(status, message)| {
                CowpostError::PublishError(format!(
                    "HTTP {} from {}: {}",
                    status.as_u16(),
                    url,
                    message
                ))
            })?;

        let post: PostRef = response.json().await.map_err(|e| {
            CowpostError::PublishError(format!("Malformed createRecord response: {}", e))
        })?;

        info!("Created post {}", post.uri);
        Ok(post)
    }
}

/// Pass successful responses through, turn the rest into (status, description)
async fn check_status(
    response: Response,
    url: &str,
) -> std::result::Result<Response, (StatusCode, String)> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!("XRPC error {} from {}: {}", status, url, body);
    Err((status, XrpcError::describe(&body)))
}
