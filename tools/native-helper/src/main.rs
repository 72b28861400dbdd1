//! Beat Loop extraction helper
//!
//! A small local HTTP server the loop toolkit talks to: it pulls the best
//! audio track of a video with yt-dlp, converts it to MP3 and streams it
//! back, and looks up title/channel/description for key and tempo tags.

mod download;
mod error;
mod server;
mod tags;
mod utils;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Beat Loop Helper - local audio extraction for the loop toolkit
#[derive(Parser, Debug)]
#[command(name = "beatloop-helper")]
#[command(version)]
struct Args {
    /// Port to listen on (127.0.0.1 only)
    #[arg(short, long, default_value = "3456")]
    port: u16,

    /// Scratch directory for in-flight extractions
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Directory holding ffmpeg, when it is not on PATH
    #[arg(long)]
    ffmpeg_location: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let work_dir = args.work_dir.unwrap_or_else(utils::default_work_dir);
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("creating work dir {}", work_dir.display()))?;

    let ffmpeg_dir = args.ffmpeg_location.or_else(download::find_ffmpeg_dir);
    let ytdlp_found = download::find_ytdlp().is_some();
    if !ytdlp_found {
        warn!("yt-dlp not found. Install with: pip install yt-dlp");
    }

    println!();
    println!("========================================================");
    println!("  Beat Loop Helper v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================================");
    println!("  HTTP:      http://127.0.0.1:{}", args.port);
    println!("  Work dir:  {}", work_dir.display());
    println!("  yt-dlp:    {}", if ytdlp_found { "OK" } else { "NOT FOUND" });
    println!(
        "  FFmpeg:    {}",
        ffmpeg_dir
            .as_ref()
            .map_or_else(|| "PATH".to_string(), |d| d.display().to_string())
    );
    println!("========================================================");
    println!();

    let config = server::ServerConfig {
        port: args.port,
        work_dir,
        ffmpeg_dir,
    };

    info!(port = config.port, "starting helper");
    if let Err(e) = server::run(config).await {
        error!("Server error: {:#}", e);
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_extension_expectations() {
        let args = Args::parse_from(["beatloop-helper"]);
        assert_eq!(args.port, 3456);
        assert!(args.work_dir.is_none());
        assert_eq!(args.log_level, "info");
    }
}
