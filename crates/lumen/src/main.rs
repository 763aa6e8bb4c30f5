//! Lumen CLI - adaptive image enhancement.
//!
//! Lumen classifies each image as a product photo, document scan or
//! landscape with a CLIP zero-shot classifier, applies the matching
//! enhancement chain, and reports PSNR / SSIM against the original.
//!
//! # Usage
//!
//! ```bash
//! # Download the CLIP encoders once
//! lumen models download
//!
//! # Enhance a single image
//! lumen enhance receipt.jpg
//!
//! # Enhance a directory, writing records as JSON Lines
//! lumen enhance ./photos/ --output results.jsonl
//!
//! # Classify only
//! lumen classify ./photos/
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Lumen - classify, enhance, and score images.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify and enhance images, with optional quality metrics
    Enhance(cli::enhance::EnhanceArgs),

    /// Classify images without enhancing them
    Classify(cli::classify::ClassifyArgs),

    /// Manage the CLIP model files (download, list, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go straight to stderr.
    let config = match lumen_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `lumen config path`."
            );
            lumen_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    match cli.command {
        Commands::Enhance(args) => cli::enhance::execute(args, config).await,
        Commands::Classify(args) => cli::classify::execute(args, config).await,
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config),
    }
}
