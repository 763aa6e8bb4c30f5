//! The `lumen classify` command: report each image's domain.

use clap::Args;
use lumen_core::pipeline::{FileDiscovery, ImageDecoder, Validator};
use lumen_core::{Classification, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::enhance::setup::{ensure_input, load_pipeline, run_blocking};

/// Arguments for the `classify` command.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Image file or directory to classify
    #[arg(required = true)]
    pub input: PathBuf,

    /// Print one JSON classification per line instead of text
    #[arg(long)]
    pub json: bool,
}

/// Execute the classify command.
pub async fn execute(args: ClassifyArgs, config: Config) -> anyhow::Result<()> {
    ensure_input(&args.input)?;

    let pipeline = Arc::new(load_pipeline(&config)?);
    let decoder = Arc::new(ImageDecoder::new(config.limits.clone()));
    let validator = Validator::new(config.limits.clone());
    let timeout = Duration::from_millis(config.limits.pipeline_timeout_ms);

    let files = FileDiscovery::new(config.processing.clone()).discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    let show_path = files.len() > 1;

    for file in files {
        if let Err(e) = validator.validate(&file.path) {
            tracing::error!("Failed: {:?} - {}", file.path, e);
            continue;
        }

        let pipeline = Arc::clone(&pipeline);
        let decoder = Arc::clone(&decoder);
        let path = file.path.clone();
        let outcome = run_blocking(timeout, move |_| {
            let decoded = decoder.decode_file(&path)?;
            Ok(pipeline.classify(&decoded.image)?)
        })
        .await;

        match outcome {
            Ok(classification) => {
                println!(
                    "{}",
                    render(&file.path, &classification, args.json, show_path)?
                );
            }
            Err(e) => tracing::error!("Failed: {:?} - {:#}", file.path, e),
        }
    }

    Ok(())
}

fn render(
    path: &Path,
    classification: &Classification,
    json: bool,
    show_path: bool,
) -> anyhow::Result<String> {
    if json {
        let value = serde_json::json!({
            "file_path": path,
            "classification": classification,
        });
        return Ok(serde_json::to_string(&value)?);
    }
    Ok(if show_path {
        format!("{}: {}", path.display(), classification.summary())
    } else {
        classification.summary()
    })
}
