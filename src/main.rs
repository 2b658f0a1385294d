// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use depthcam::config::PipelineConfig;

mod cli;

#[derive(Parser)]
#[command(name = "depthcam")]
#[command(about = "Real-time color and depth frame fusion pipeline")]
#[command(version)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fusion preview against the synthetic source
    Run {
        /// Preview duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Seconds between automatic mix-factor toggles
        #[arg(short, long, default_value = "2")]
        toggle_interval: u64,
    },

    /// Capture a single fused still
    Photo {
        /// Output file path (default: ./photo_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Blend weight between color (0.0) and depth (1.0)
        #[arg(short, long, default_value = "1.0")]
        mix: f32,

        /// Save the color frame without depth fusion
        #[arg(long)]
        no_depth: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depthcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let args = Cli::parse();

    let config = match args.config {
        Some(path) => PipelineConfig::load(&path)?,
        None => PipelineConfig::default(),
    };

    match args.command {
        Some(Commands::Run {
            duration,
            toggle_interval,
        }) => cli::run_preview(config, duration, toggle_interval),
        Some(Commands::Photo {
            output,
            mix,
            no_depth,
        }) => cli::take_photo(config, output, mix, no_depth),
        None => cli::run_preview(config, 10, 2),
    }
}
