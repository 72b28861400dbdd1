//! Beat Loop desktop harness.
//!
//! Hosts the loop controller on a simulated watch page: a wall-clock video
//! player, the column of blocks below it, and the injected loop panel and
//! download row.

mod app;
mod download_row;
mod page;
mod panel_ui;
mod player;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use app::BeatLoopApp;
use bl_looper::{FileStore, LoopConfig, LoopStore, SystemClock};

/// Beat Loop - A/B looping for watch pages
#[derive(Parser, Debug)]
#[command(name = "beatloop")]
#[command(version)]
struct Args {
    /// Loop controller config (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where loop regions are persisted
    #[arg(long)]
    store: Option<PathBuf>,

    /// Page address to open
    #[arg(long, default_value = "https://www.youtube.com/watch?v=abc12345678")]
    url: String,

    /// Base URL of the local extraction helper
    #[arg(long, default_value = "http://127.0.0.1:3456")]
    helper_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    FmtSubscriber::builder()
        .with_max_level(parse_level(&args.log_level))
        .with_target(false)
        .compact()
        .init();

    let config = match &args.config {
        Some(path) => LoopConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoopConfig::default(),
    };

    let store_path = args
        .store
        .clone()
        .or_else(FileStore::default_path)
        .unwrap_or_else(|| PathBuf::from("loop-state.json"));
    let backend = FileStore::open(&store_path);
    let store = LoopStore::new(Box::new(backend), Box::new(SystemClock), &config);

    info!(store = %store_path.display(), helper = %args.helper_url, "Beat Loop starting...");
    if !args.url.contains("/watch") {
        warn!(url = %args.url, "start page is not a watch page, the loop panel stays hidden");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Beat Loop")
            .with_inner_size([960.0, 760.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Beat Loop",
        options,
        Box::new(move |_cc| {
            let app = BeatLoopApp::new(config, store, &args.url, &args.helper_url);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe: {e}"))
}
