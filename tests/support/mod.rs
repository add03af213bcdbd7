//! Canned-response HTTP server for exercising the XRPC client

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const CREATE_SESSION: &str = "/xrpc/com.atproto.server.createSession";
pub const UPLOAD_BLOB: &str = "/xrpc/com.atproto.repo.uploadBlob";
pub const CREATE_RECORD: &str = "/xrpc/com.atproto.repo.createRecord";

pub const TEST_DID: &str = "did:plc:u5cwb2mwiv2bfq53cjufe6yn";
pub const TEST_URI: &str = "at://did:plc:u5cwb2mwiv2bfq53cjufe6yn/app.bsky.feed.post/3k44deefqdk2g";

/// DejaVu Sans Mono shipped under `tests/fixtures`
pub fn fixture_font() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("DejaVuSansMono.ttf")
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

pub struct StubServer {
    url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Serve `routes` (path -> response) on a random local port
    pub async fn start(routes: Vec<(&'static str, StubResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let routes: Arc<HashMap<&'static str, StubResponse>> = Arc::new(routes.into_iter().collect());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    serve_one(stream, &routes, &recorded).await;
                });
            }
        });

        Self {
            url,
            requests,
            handle,
        }
    }

    /// The standard happy-path routes
    pub fn happy_routes() -> Vec<(&'static str, StubResponse)> {
        vec![
            (CREATE_SESSION, session_ok()),
            (UPLOAD_BLOB, upload_ok()),
            (CREATE_RECORD, record_ok()),
        ]
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn request_to(&self, path: &str) -> Option<RecordedRequest> {
        self.requests().into_iter().find(|r| r.path == path)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn session_ok() -> StubResponse {
    StubResponse::json(
        200,
        serde_json::json!({
            "did": TEST_DID,
            "handle": "moo.bsky.social",
            "accessJwt": "access-token",
            "refreshJwt": "refresh-token"
        }),
    )
}

pub fn upload_ok() -> StubResponse {
    StubResponse::json(
        200,
        serde_json::json!({
            "blob": {
                "$type": "blob",
                "ref": { "$link": "bafkreibme22gw2h7y2h7tg2fhqotaqjucnbc24deqo72b6mkl2egezxhvy" },
                "mimeType": "image/png",
                "size": 4321
            }
        }),
    )
}

pub fn record_ok() -> StubResponse {
    StubResponse::json(
        200,
        serde_json::json!({
            "uri": TEST_URI,
            "cid": "bafyreig2fjxi3rptqdgylg7e5hmjl6mcke7rn2b6cugzlqq3i4zu6rq52q"
        }),
    )
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn serve_one(
    mut stream: TcpStream,
    routes: &HashMap<&'static str, StubResponse>,
    recorded: &Mutex<Vec<RecordedRequest>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default();
    let path = target.split('?').next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }

    let response = routes.get(path.as_str()).cloned().unwrap_or_else(|| {
        StubResponse::json(404, serde_json::json!({ "error": "MethodNotImplemented" }))
    });

    recorded.lock().expect("requests lock").push(RecordedRequest {
        method,
        path,
        headers,
        body,
    });

    let reply = format!(
        "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;
}
