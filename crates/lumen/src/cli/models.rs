//! The `lumen models` command for managing the CLIP model files.

use clap::{Args, Subcommand};
use lumen_core::classifier::{TEXT_MODEL_FILENAME, TOKENIZER_FILENAME, VISUAL_MODEL_FILENAME};
use lumen_core::pipeline::content_hash;
use lumen_core::Config;
use std::path::{Path, PathBuf};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the CLIP vision encoder, text encoder and tokenizer
    Download {
        /// Hugging Face repository to download from
        #[arg(long, default_value = DEFAULT_REPO)]
        repo: String,

        /// Re-download files that already exist
        #[arg(long)]
        force: bool,
    },

    /// List installed model files
    List,

    /// Show the classifier model directory
    Path,
}

/// ONNX export of CLIP ViT-B/32 with separate vision and text encoders.
const DEFAULT_REPO: &str = "Xenova/clip-vit-base-patch32";

/// A file fetched from the repository and where it lands locally.
struct ModelFile {
    remote_path: &'static str,
    local_name: &'static str,
    label: &'static str,
}

const MODEL_FILES: &[ModelFile] = &[
    ModelFile {
        remote_path: "onnx/vision_model.onnx",
        local_name: VISUAL_MODEL_FILENAME,
        label: "Vision encoder",
    },
    ModelFile {
        remote_path: "onnx/text_model.onnx",
        local_name: TEXT_MODEL_FILENAME,
        label: "Text encoder",
    },
    ModelFile {
        remote_path: "tokenizer.json",
        local_name: TOKENIZER_FILENAME,
        label: "Tokenizer",
    },
];

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    let model_dir = config.classifier_dir();

    match args.command {
        ModelsCommand::Download { repo, force } => {
            std::fs::create_dir_all(&model_dir)?;
            let client = reqwest::Client::new();

            for file in MODEL_FILES {
                let dest = model_dir.join(file.local_name);
                if dest.exists() && !force {
                    tracing::info!("{} already exists at {:?}", file.label, dest);
                    continue;
                }

                let url = remote_url(&repo, file.remote_path);
                tracing::info!("Downloading {}...", file.label);
                tracing::info!("  Source: {}", url);
                tracing::info!("  Destination: {:?}", dest);

                download_file(&client, &url, &dest).await?;

                let file_size = std::fs::metadata(&dest)?.len();
                let digest = content_hash(&dest)?;
                tracing::info!(
                    "  {} complete ({:.1} MB, blake3 {})",
                    file.label,
                    file_size as f64 / (1024.0 * 1024.0),
                    digest
                );
            }

            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            println!("Classifier model: {}", config.classifier.model);
            println!("  Directory: {}\n", model_dir.display());

            for file in MODEL_FILES {
                let status = if model_dir.join(file.local_name).exists() {
                    "ready"
                } else {
                    "not installed"
                };
                println!("    - {:20} {}", file.local_name, status);
            }

            if !missing_files(&model_dir).is_empty() {
                println!("\nRun `lumen models download` to install the missing files.");
            }
        }

        ModelsCommand::Path => {
            println!("{}", model_dir.display());
        }
    }

    Ok(())
}

fn remote_url(repo: &str, remote_path: &str) -> String {
    format!("https://huggingface.co/{}/resolve/main/{}", repo, remote_path)
}

/// Local model files that are not on disk yet.
fn missing_files(model_dir: &Path) -> Vec<&'static str> {
    MODEL_FILES
        .iter()
        .map(|f| f.local_name)
        .filter(|name| !model_dir.join(name).exists())
        .collect()
}

/// Sibling path a download streams into before it is complete.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Download a file from a URL to a local path, streaming to disk.
///
/// Data goes to a `.part` file that is renamed into place only once the
/// download finishes, so an interrupted download never looks installed.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let partial = partial_path(dest);
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, dest).await?;

    Ok(())
}
