//! Pipeline setup: config overrides, model loading, record writers.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lumen_core::pipeline::{FileDiscovery, ImageDecoder, Validator};
use lumen_core::{Config, DomainClassifier, OutputWriter, Pipeline, RunOptions};

use super::types::OutputFormat;
use super::EnhanceArgs;

/// Everything needed to process files, assembled once per invocation.
pub(crate) struct EnhanceContext {
    pub pipeline: Arc<Pipeline>,
    pub decoder: Arc<ImageDecoder>,
    pub validator: Validator,
    pub discovery: FileDiscovery,
    pub options: RunOptions,
    /// Where enhanced images are saved; `None` with `--no-save`
    pub save_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub pretty: bool,
}

/// Validate input, apply CLI overrides, and load the pipeline.
pub(crate) fn setup_pipeline(
    args: &EnhanceArgs,
    mut config: Config,
) -> anyhow::Result<EnhanceContext> {
    ensure_input(&args.input)?;

    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    let save_dir = (!args.no_save).then(|| config.output_dir());

    let pipeline = load_pipeline(&config)?;

    let options = if args.no_metrics {
        RunOptions::without_metrics()
    } else {
        RunOptions::default()
    };

    let mut discovery = FileDiscovery::new(config.processing.clone());
    if let Some(dir) = &save_dir {
        discovery = discovery.excluding(dir.clone());
    }

    Ok(EnhanceContext {
        pipeline: Arc::new(pipeline),
        decoder: Arc::new(ImageDecoder::new(config.limits.clone())),
        validator: Validator::new(config.limits.clone()),
        discovery,
        options,
        save_dir,
        timeout: Duration::from_millis(config.limits.pipeline_timeout_ms),
        format: OutputFormat::resolve(args.format, args.output.as_deref(), &config.output.format),
        pretty: config.output.pretty,
    })
}

pub(crate) fn ensure_input(input: &Path) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            input
        );
    }
    Ok(())
}

/// Load the CLIP classifier and build the pipeline. Missing model files
/// abort the command.
pub(crate) fn load_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    if !DomainClassifier::model_exists(&config.classifier, &config.model_dir()) {
        anyhow::bail!(
            "CLIP model files not found in {:?}\n\n  \
             Hint: Run `lumen models download` first.",
            config.classifier_dir()
        );
    }
    let pipeline = Pipeline::load(config)?;
    tracing::info!("Classifier loaded");
    Ok(pipeline)
}

/// Set once the caller has stopped waiting for a blocking task.
#[derive(Debug, Clone, Default)]
pub(crate) struct Abandoned(Arc<AtomicBool>);

impl Abandoned {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Run CPU-bound work on the blocking pool under a wall-clock limit.
///
/// Blocking tasks cannot be interrupted: after a timeout the task keeps
/// running to completion in the background, still using a core. The task
/// receives an [`Abandoned`] flag and must check it before any side effect
/// that should not happen for a file already reported as failed.
pub(crate) async fn run_blocking<T, F>(timeout: Duration, task: F) -> anyhow::Result<T>
where
    F: FnOnce(&Abandoned) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let abandoned = Abandoned::default();
    let flag = abandoned.clone();
    let handle = tokio::task::spawn_blocking(move || task(&flag));
    match tokio::time::timeout(timeout, handle).await {
        Ok(joined) => joined.context("Pipeline task panicked")?,
        Err(_) => {
            abandoned.set();
            anyhow::bail!("Timed out after {}ms", timeout.as_millis())
        }
    }
}

/// Open a record writer on `output`, or stdout when it is `None`.
pub(crate) fn open_writer(
    output: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<OutputWriter<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create output file {:?}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };
    Ok(OutputWriter::new(sink, format.into(), pretty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::PipelineError;

    #[tokio::test]
    async fn test_run_blocking_returns_value() {
        let value = run_blocking(Duration::from_secs(5), |_| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_blocking_keeps_pipeline_error() {
        let err = run_blocking::<(), _>(Duration::from_secs(5), |_| {
            Err(PipelineError::UnsupportedDomain("portrait".to_string()).into())
        })
        .await
        .unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
    }

    #[tokio::test]
    async fn test_run_blocking_times_out() {
        let err = run_blocking(Duration::from_millis(10), |_| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_timed_out_task_sees_abandoned_flag() {
        let observed = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&observed);
        let result = run_blocking(Duration::from_millis(10), move |abandoned: &Abandoned| {
            std::thread::sleep(Duration::from_millis(200));
            seen.store(abandoned.is_set(), Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_completed_task_not_abandoned() {
        let abandoned = run_blocking(Duration::from_secs(5), |abandoned: &Abandoned| {
            Ok(abandoned.is_set())
        })
        .await
        .unwrap();
        assert!(!abandoned);
    }

    #[test]
    fn test_ensure_input_missing() {
        let err = ensure_input(Path::new("/nonexistent/lumen/input.png")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_open_writer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let mut writer = open_writer(Some(&path), OutputFormat::Jsonl, false).unwrap();
        writer.write(&serde_json::json!({"domain": "product"})).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"domain\":\"product\"}\n");
    }
}
