//! The `lumen enhance` command: classify, enhance and score images.

mod batch;
pub(crate) mod setup;
pub mod types;

pub use types::OutputFormat;

use clap::Args;
use lumen_core::output::{enhanced_path, save_enhanced};
use lumen_core::types::unix_timestamp;
use lumen_core::EnhancementRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use batch::process_batch;
use setup::{open_writer, run_blocking, setup_pipeline, EnhanceContext};

/// Arguments for the `enhance` command.
#[derive(Args, Debug)]
pub struct EnhanceArgs {
    /// Image file or directory to enhance
    #[arg(required = true)]
    pub input: PathBuf,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Record format (defaults to the output extension, then config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Directory for enhanced images (overrides `output.dir`)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Skip PSNR / SSIM / brightness evaluation
    #[arg(long)]
    pub no_metrics: bool,

    /// Do not save enhanced images, only emit records
    #[arg(long)]
    pub no_save: bool,
}

/// Execute the enhance command.
pub async fn execute(args: EnhanceArgs, config: lumen_core::Config) -> anyhow::Result<()> {
    let ctx = setup_pipeline(&args, config)?;

    let files = ctx.discovery.discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to enhance", files.len());

    if args.input.is_file() {
        process_single(&ctx, &args).await
    } else {
        process_batch(&ctx, &args, files).await
    }
}

/// Enhance one file and emit its record.
async fn process_single(ctx: &EnhanceContext, args: &EnhanceArgs) -> anyhow::Result<()> {
    let record = process_file(ctx, &args.input).await?;

    let pretty = ctx.pretty || args.output.is_none();
    let mut writer = open_writer(args.output.as_deref(), ctx.format, pretty)?;
    writer.write(&record)?;
    writer.flush()?;

    if let Some(output_path) = &args.output {
        tracing::info!("Output written to {:?}", output_path);
    }
    Ok(())
}

/// Validate, decode, run the pipeline on, and optionally save one file.
pub(crate) async fn process_file(
    ctx: &EnhanceContext,
    path: &Path,
) -> anyhow::Result<EnhancementRecord> {
    ctx.validator.validate(path)?;

    let pipeline = Arc::clone(&ctx.pipeline);
    let decoder = Arc::clone(&ctx.decoder);
    let options = ctx.options;
    let save_dir = ctx.save_dir.clone();
    let source = path.to_path_buf();

    run_blocking(ctx.timeout, move |abandoned| {
        let decoded = decoder.decode_file(&source)?;
        let result = pipeline.run(&decoded.image, &options)?;
        tracing::info!("{:?}: {}", source, result.summary());

        let enhanced_path = match save_dir {
            Some(dir) => {
                if abandoned.is_set() {
                    anyhow::bail!("Timed out before saving {:?}", source);
                }
                let dest = enhanced_path(&dir, result.domain, &source);
                save_enhanced(&result.enhanced, &dest)?;
                tracing::debug!("Saved enhanced image to {:?}", dest);
                Some(dest)
            }
            None => None,
        };

        Ok(EnhancementRecord {
            file_name: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: source,
            content_hash: decoded.content_hash,
            width: decoded.width,
            height: decoded.height,
            domain: result.domain,
            confidence: result.confidence,
            scores: result.scores,
            enhanced_path,
            metrics: result.metrics,
            processed_at: unix_timestamp(),
        })
    })
    .await
}
