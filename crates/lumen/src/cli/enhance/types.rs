//! CLI enum types for the enhance command.

use clap::ValueEnum;
use lumen_core::OutputFormat as CoreOutputFormat;

/// Supported record formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl OutputFormat {
    /// Pick the record format: the flag if given, else the output file's
    /// extension, else the configured default.
    pub fn resolve(
        flag: Option<OutputFormat>,
        output: Option<&std::path::Path>,
        configured: &str,
    ) -> OutputFormat {
        flag.or_else(|| output.and_then(CoreOutputFormat::from_path).map(Self::from))
            .or_else(|| CoreOutputFormat::parse(configured).map(Self::from))
            .unwrap_or(OutputFormat::Json)
    }
}

impl From<CoreOutputFormat> for OutputFormat {
    fn from(format: CoreOutputFormat) -> Self {
        match format {
            CoreOutputFormat::Json => OutputFormat::Json,
            CoreOutputFormat::JsonLines => OutputFormat::Jsonl,
        }
    }
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}
