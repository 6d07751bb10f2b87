//! Binary entrypoint for ringview.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use ringview::ring::Ring;
use ringview::scan::{self, PathHooks, ScanOptions};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "ringview", about = "Pan/zoom image viewer over a ring of paths")]
struct Cli {
    /// Image files or directories to view
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Recurse into subdirectories of directory arguments
    #[arg(short, long)]
    recursive: bool,

    /// Override the extension allow-list (lowercase, no dot; repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    exts: Vec<String>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("ringview={}", level).parse().unwrap())
        .add_directive("wgpu=warn".parse().unwrap())
        .add_directive("winit=warn".parse().unwrap());
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let opts = ScanOptions {
        recursive: cli.recursive,
        exts: if cli.exts.is_empty() {
            None
        } else {
            Some(cli.exts)
        },
    };

    let mut ring = Ring::new(PathHooks);
    let entry = scan::collect_into_ring(&mut ring, &cli.paths, &opts)
        .context("collecting image paths")?;
    let Some(entry) = entry else {
        return Err(ringview::Error::EmptyScan.into());
    };
    info!(count = ring.len(entry), "collected images");
    debug!("ring:\n{}", ring.list(entry));

    ringview::render::viewer::run(&ring, entry).context("running viewer")?;

    ring.free_all(entry);
    debug!("image ring released");
    Ok(())
}
