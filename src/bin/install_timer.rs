//! Generate and install the systemd user units that run cowpost periodically

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cowpost::install::{
    activation_commands, default_unit_dir, render_service, render_timer, write_units,
    UnitOptions, DEFAULT_INTERVAL_MINUTES, SERVICE_NAME, TIMER_NAME,
};

#[derive(Debug, Parser)]
#[command(name = "cowpost-install-timer", version, about)]
struct Args {
    /// Minutes between posts
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MINUTES)]
    interval_minutes: u32,

    /// Directory to write the units to (default: ~/.config/systemd/user)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path of the cowpost binary (default: next to this installer)
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Working directory holding .env (default: current directory)
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Print the units instead of writing them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    let binary = match args.binary {
        Some(path) => path,
        None => std::env::current_exe()
            .context("Cannot locate the installer executable")?
            .with_file_name("cowpost"),
    };
    let working_dir = match args.working_dir {
        Some(path) => path,
        None => std::env::current_dir().context("Cannot read the current directory")?,
    };

    let options = UnitOptions {
        interval_minutes: args.interval_minutes,
        binary: std::path::absolute(&binary).unwrap_or(binary),
        working_dir: std::path::absolute(&working_dir).unwrap_or(working_dir),
    };
    options.validate()?;

    if args.dry_run {
        println!("# {}\n{}", SERVICE_NAME, render_service(&options));
        println!("# {}\n{}", TIMER_NAME, render_timer(&options));
        return Ok(());
    }

    let Some(dir) = args.output_dir.or_else(default_unit_dir) else {
        bail!("Cannot determine the systemd user unit directory; pass --output-dir");
    };
    for path in write_units(&options, &dir)? {
        println!("Wrote {}", path.display());
    }

    println!("Enable the timer with:");
    for command in activation_commands() {
        println!("  {}", command);
    }
    Ok(())
}
