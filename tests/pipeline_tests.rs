//! End-to-end runs of the posting pipeline against a local stub server

mod support;

use std::collections::HashMap;
use std::path::Path;

use tempfile::TempDir;

use cowpost::bluesky::{BlueskyClient, PostRef};
use cowpost::errors::CowpostError;
use cowpost::{Config, StaticGenerator};
use support::*;

const COW: &str = "\x1b[38;5;214m _____\x1b[0m\n\x1b[38;5;208m< moo >\x1b[0m\n\x1b[38;5;202m -----\x1b[0m\n        \\   ^__^\n";

fn test_config(server: &StubServer, debug_image: &Path) -> Config {
    let values: HashMap<&str, String> = HashMap::from([
        ("BSKY_IDENTIFIER", "moo.bsky.social".to_string()),
        ("BSKY_APP_PASSWORD", "app-password".to_string()),
        ("BSKY_PDS_HOST", server.url().to_string()),
        ("BSKY_POST_TEXT", "daily cow".to_string()),
        ("BSKY_DEBUG_IMAGE", debug_image.display().to_string()),
        ("BSKY_TIMEOUT_SECONDS", "5".to_string()),
        ("BSKY_FONT_PATH", fixture_font().display().to_string()),
    ]);
    Config::from_lookup(|key| values.get(key).cloned()).expect("valid test config")
}

fn client_for(config: &Config) -> BlueskyClient {
    BlueskyClient::new(&config.pds_host, config.timeout_seconds).expect("client")
}

#[tokio::test]
async fn test_empty_generator_output_stops_before_any_call() {
    let server = StubServer::start(StubServer::happy_routes()).await;
    let dir = TempDir::new().expect("temp dir");
    let image_path = dir.path().join("last_cowsay.png");
    let config = test_config(&server, &image_path);

    let err = cowpost::run(&config, &StaticGenerator::new(""), &client_for(&config))
        .await
        .unwrap_err();

    assert!(matches!(err, CowpostError::PipelineError(_)));
    assert!(server.requests().is_empty());
    assert!(!image_path.exists());
}

#[tokio::test]
async fn test_successful_run_posts_and_keeps_image() {
    let server = StubServer::start(StubServer::happy_routes()).await;
    let dir = TempDir::new().expect("temp dir");
    let image_path = dir.path().join("last_cowsay.png");
    let config = test_config(&server, &image_path);

    let report = cowpost::run(&config, &StaticGenerator::new(COW), &client_for(&config))
        .await
        .expect("run succeeds");

    assert!(PostRef::is_post_uri(&report.post.uri));
    assert_eq!(report.handle, "moo.bsky.social");
    assert_eq!(server.paths(), vec![CREATE_SESSION, UPLOAD_BLOB, CREATE_RECORD]);

    let png = std::fs::read(&image_path).expect("debug image written");
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    let upload = server.request_to(UPLOAD_BLOB).expect("uploaded");
    assert_eq!(upload.body, png);

    let record = server.request_to(CREATE_RECORD).expect("published").json();
    let alt = record["record"]["embed"]["images"][0]["alt"].as_str().unwrap_or_default();
    assert_eq!(alt, report.alt_text);
    assert!(alt.starts_with("_____\n< moo >"));
    assert!(!alt.contains('\x1b'));
    assert_eq!(record["record"]["text"], "daily cow");
}

#[tokio::test]
async fn test_upload_failure_skips_publish_but_writes_image() {
    let mut routes = StubServer::happy_routes();
    routes[1] = (
        UPLOAD_BLOB,
        StubResponse::json(500, serde_json::json!({ "error": "InternalServerError" })),
    );
    let server = StubServer::start(routes).await;
    let dir = TempDir::new().expect("temp dir");
    let image_path = dir.path().join("last_cowsay.png");
    let config = test_config(&server, &image_path);

    let err = cowpost::run(&config, &StaticGenerator::new(COW), &client_for(&config))
        .await
        .unwrap_err();

    assert!(matches!(err, CowpostError::UploadError { status: Some(500), .. }));
    assert_eq!(server.paths(), vec![CREATE_SESSION, UPLOAD_BLOB]);
    assert!(image_path.exists());
}

#[tokio::test]
async fn test_auth_failure_stops_before_upload() {
    let server = StubServer::start(vec![(
        CREATE_SESSION,
        StubResponse::json(401, serde_json::json!({ "error": "AuthenticationRequired" })),
    )])
    .await;
    let dir = TempDir::new().expect("temp dir");
    let image_path = dir.path().join("last_cowsay.png");
    let config = test_config(&server, &image_path);

    let err = cowpost::run(&config, &StaticGenerator::new(COW), &client_for(&config))
        .await
        .unwrap_err();

    assert!(matches!(err, CowpostError::AuthError(_)));
    assert_eq!(server.paths(), vec![CREATE_SESSION]);
    assert!(image_path.exists());
}
