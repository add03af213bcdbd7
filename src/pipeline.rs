//! One posting run: generate, render, authenticate, upload, publish
//!
//! Stages run strictly in order and the first failure ends the run. The
//! debug image is written before any network call so it survives a failed
//! upload or publish. A blob uploaded before a failed publish is left behind.

use std::path::PathBuf;

use tracing::{error, info, instrument};

use crate::bluesky::{BlueskyClient, PostDraft, PostRef};
use crate::config::Config;
use crate::errors::Result;
use crate::generator::TextGenerator;
use crate::render::Renderer;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The created post
    pub post: PostRef,
    /// Where the rendered image was written
    pub image_path: PathBuf,
    /// Alt text attached to the image
    pub alt_text: String,
    /// Handle of the posting account
    pub handle: String,
}

/// Run the whole pipeline once
#[instrument(level = "info", skip_all, fields(host = %client.host()))]
pub async fn run(
    config: &Config,
    generator: &dyn TextGenerator,
    client: &BlueskyClient,
) -> Result<RunReport> {
    let result = run_stages(config, generator, client).await;
    if let Err(e) = &result {
        error!("Run failed at {} stage: {}", e.stage(), e);
    }
    result
}

async fn run_stages(
    config: &Config,
    generator: &dyn TextGenerator,
    client: &BlueskyClient,
) -> Result<RunReport> {
    info!("Generating text with {}", generator.describe());
    let text = generator.generate().await?;

    let renderer = Renderer::new(config.render.clone())?;
    let image = renderer.render(&text.raw)?;
    let png = image.save_png(&config.debug_image)?;

    let session = client
        .create_session(&config.identifier, &config.app_password)
        .await?;
    let blob = client.upload_blob(&session, png).await?;

    let alt_text = text.alt_text();
    let draft = PostDraft::new(config.post_text.clone(), alt_text.clone(), blob)
        .with_aspect_ratio(image.width(), image.height());
    let post = client.create_post(&session, &draft).await?;

    Ok(RunReport {
        post,
        image_path: config.debug_image.clone(),
        alt_text,
        handle: session.handle,
    })
}
