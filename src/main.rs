use anyhow::Context;
use tracing_subscriber::EnvFilter;

use cowpost::bluesky::BlueskyClient;
use cowpost::{Config, ShellGenerator};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries the post URI
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cowpost=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting cowpost version {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;
    let generator = ShellGenerator::new(config.generator_cmd.clone());
    let client = BlueskyClient::new(&config.pds_host, config.timeout_seconds)?;

    let report = cowpost::run(&config, &generator, &client).await?;

    println!("Posted successfully: {}", report.post.uri);
    if let Some(url) = report.post.web_url(&report.handle) {
        tracing::info!("View at {}", url);
    }
    Ok(())
}
