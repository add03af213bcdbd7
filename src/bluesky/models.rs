//! AT Protocol request and response types

use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref POST_URI: Regex =
        Regex::new(r"^at://(did:[a-z0-9]+:[A-Za-z0-9._:%-]+)/app\.bsky\.feed\.post/([A-Za-z0-9._~:-]+)$")
            .expect("post URI regex is valid");
}

pub const POST_COLLECTION: &str = "app.bsky.feed.post";
pub const IMAGES_EMBED: &str = "app.bsky.embed.images";
pub const BLOB_TYPE: &str = "blob";

/// `com.atproto.server.createSession` input
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

/// Authenticated session
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Account DID, used as the repo for new records
    pub did: String,
    /// Account handle
    #[serde(default)]
    pub handle: String,
    /// Bearer token for subsequent calls
    pub access_jwt: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("access_jwt", &"<redacted>")
            .finish()
    }
}

/// CID link inside a blob reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// Uploaded blob descriptor, passed back verbatim in the post record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    #[serde(rename = "$type", default = "default_blob_type")]
    pub blob_type: String,
    #[serde(rename = "ref")]
    pub reference: CidLink,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: u64,
}

fn default_blob_type() -> String {
    BLOB_TYPE.to_string()
}

/// `com.atproto.repo.uploadBlob` output
#[derive(Debug, Deserialize)]
pub struct UploadBlobResponse {
    pub blob: Option<BlobRef>,
}

/// Width and height hint shown by clients before the image loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

/// One image inside an `app.bsky.embed.images` embed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedImage<'a> {
    pub alt: &'a str,
    pub image: &'a BlobRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Serialize)]
pub struct ImagesEmbed<'a> {
    #[serde(rename = "$type")]
    pub embed_type: &'static str,
    pub images: Vec<EmbedImage<'a>>,
}

/// `app.bsky.feed.post` record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord<'a> {
    #[serde(rename = "$type")]
    pub record_type: &'static str,
    pub text: &'a str,
    pub created_at: String,
    pub embed: ImagesEmbed<'a>,
}

/// `com.atproto.repo.createRecord` input
#[derive(Debug, Serialize)]
pub struct CreateRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'static str,
    pub record: PostRecord<'a>,
}

/// Everything needed to publish one image post
#[derive(Debug, Clone)]
pub struct PostDraft {
    /// Caption
    pub text: String,
    /// Image description
    pub alt_text: String,
    /// Uploaded image
    pub blob: BlobRef,
    /// Image dimensions, if known
    pub aspect_ratio: Option<AspectRatio>,
    /// Record timestamp
    pub created_at: DateTime<Utc>,
}

impl PostDraft {
    pub fn new(text: impl Into<String>, alt_text: impl Into<String>, blob: BlobRef) -> Self {
        Self {
            text: text.into(),
            alt_text: alt_text.into(),
            blob,
            aspect_ratio: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_aspect_ratio(mut self, width: u32, height: u32) -> Self {
        self.aspect_ratio = Some(AspectRatio { width, height });
        self
    }

    /// Build the `createRecord` body for the given repo
    pub fn to_request<'a>(&'a self, repo: &'a str) -> CreateRecordRequest<'a> {
        CreateRecordRequest {
            repo,
            collection: POST_COLLECTION,
            record: PostRecord {
                record_type: POST_COLLECTION,
                text: &self.text,
                created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                embed: ImagesEmbed {
                    embed_type: IMAGES_EMBED,
                    images: vec![EmbedImage {
                        alt: &self.alt_text,
                        image: &self.blob,
                        aspect_ratio: self.aspect_ratio,
                    }],
                },
            },
        }
    }
}

/// Reference to a created record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostRef {
    pub uri: String,
    #[serde(default)]
    pub cid: String,
}

impl PostRef {
    /// Whether `uri` has the `at://<did>/app.bsky.feed.post/<rkey>` shape
    pub fn is_post_uri(uri: &str) -> bool {
        POST_URI.is_match(uri)
    }

    /// Record key, the last path segment of the URI
    pub fn rkey(&self) -> Option<&str> {
        POST_URI
            .captures(&self.uri)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str())
    }

    /// Link to the post in the Bluesky web app
    pub fn web_url(&self, handle: &str) -> Option<String> {
        self.rkey()
            .map(|rkey| format!("https://bsky.app/profile/{}/post/{}", handle, rkey))
    }
}

/// XRPC error body
#[derive(Debug, Default, Deserialize)]
pub struct XrpcError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl XrpcError {
    /// Human readable description of an error response body
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<XrpcError>(body) {
            Ok(XrpcError {
                error: Some(error),
                message: Some(message),
            }) => format!("{}: {}", error, message),
            Ok(XrpcError {
                error: Some(text), ..
            })
            | Ok(XrpcError {
                message: Some(text),
                ..
            }) => text,
            _ if body.trim().is_empty() => "empty response body".to_string(),
            _ => body.trim().to_string(),
        }
    }
}
