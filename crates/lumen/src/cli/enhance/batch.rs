//! Directory runs: per-file error isolation, progress, and a summary.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use lumen_core::pipeline::DiscoveredFile;
use lumen_core::{Domain, EnhancementRecord, PipelineError};

use super::setup::{open_writer, EnhanceContext};
use super::types::OutputFormat;
use super::{process_file, EnhanceArgs};

/// Enhance every discovered file, continuing past per-file failures.
///
/// JSONL records are streamed as each file finishes; JSON records are
/// collected and written as one array at the end. A failure that no other
/// input can fix (model or configuration trouble) stops the run.
pub async fn process_batch(
    ctx: &EnhanceContext,
    args: &EnhanceArgs,
    files: Vec<DiscoveredFile>,
) -> anyhow::Result<()> {
    let progress = create_progress_bar(files.len() as u64);
    let mut writer = open_writer(args.output.as_deref(), ctx.format, ctx.pretty)?;
    let streaming = ctx.format == OutputFormat::Jsonl;

    let mut stats = BatchStats::default();
    let mut collected: Vec<EnhancementRecord> = Vec::new();
    let start_time = Instant::now();

    for file in &files {
        match process_file(ctx, &file.path).await {
            Ok(record) => {
                stats.record(&record, file.size);
                if streaming {
                    writer.write(&record)?;
                } else {
                    collected.push(record);
                }
            }
            Err(e) => {
                if is_fatal(&e) {
                    progress.abandon();
                    return Err(e.context(format!("Aborting at {:?}", file.path)));
                }
                stats.failed += 1;
                progress.suspend(|| tracing::error!("Failed: {:?} - {:#}", file.path, e));
            }
        }

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = (stats.succeeded + stats.failed) as f64 / elapsed;
            progress.set_message(format!("{:.1} img/sec", rate));
        }
    }

    if !streaming {
        writer.write_all(&collected)?;
    }
    writer.flush()?;
    if let Some(output_path) = &args.output {
        tracing::info!("Output written to {:?}", output_path);
    }

    progress.finish_and_clear();
    print_summary(&stats, start_time.elapsed());

    Ok(())
}

/// Failures that would repeat for every remaining file.
fn is_fatal(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<PipelineError>()
        .is_some_and(|e| !e.is_recoverable())
}

#[derive(Debug, Default)]
struct BatchStats {
    succeeded: u64,
    failed: u64,
    total_bytes: u64,
    by_domain: BTreeMap<&'static str, u64>,
}

impl BatchStats {
    fn record(&mut self, record: &EnhancementRecord, size: u64) {
        self.succeeded += 1;
        self.total_bytes += size;
        *self.by_domain.entry(record.domain.label()).or_insert(0) += 1;
    }
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(stats: &BatchStats, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        stats.succeeded as f64 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", stats.succeeded);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    for domain in Domain::ALL {
        if let Some(count) = stats.by_domain.get(domain.label()) {
            eprintln!("      {:<12}{:>8}", domain.label(), count);
        }
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", stats.succeeded + stats.failed);
    eprintln!("    Input:        {:>7.1} MB", stats.total_bytes as f64 / 1_000_000.0);
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}
