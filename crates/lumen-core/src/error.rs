//! Error types for the Lumen enhancement pipeline.
//!
//! Errors are organized by stage so the caller can tell which step failed
//! and branch on the kind of failure rather than on a formatted message.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline stage in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validate,
    Classify,
    Enhance,
    Evaluate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Classify => "classify",
            Stage::Enhance => "enhance",
            Stage::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed, empty, or unconvertible image data. Recoverable by the caller.
    Input,
    /// Model weights, config or tokenizer missing or incompatible.
    ModelLoad,
    /// A domain label with no matching enhancement branch (configuration defect).
    UnsupportedDomain,
    /// Original and enhanced images cannot be compared.
    DimensionMismatch,
    /// The ONNX runtime failed during a forward pass.
    Inference,
}

/// Width, height and channel count of an image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image data is empty, malformed, or in an unsupported pixel format
    #[error("Invalid input in {stage} stage: {message}")]
    Input { stage: Stage, message: String },

    /// Model files could not be loaded
    #[error("Failed to load model from {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    /// ONNX inference failed
    #[error("Inference failed: {message}")]
    Inference { message: String },

    /// Domain label has no enhancement branch, or a branch has no label
    #[error("Unsupported domain: {0}")]
    UnsupportedDomain(String),

    /// Metric computation on incompatible shapes
    #[error("Dimension mismatch: original {original}, enhanced {enhanced}")]
    DimensionMismatch { original: Shape, enhanced: Shape },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Shorthand for an [`PipelineError::Input`] in the given stage.
    pub fn input(stage: Stage, message: impl Into<String>) -> Self {
        Self::Input {
            stage,
            message: message.into(),
        }
    }

    /// The kind of failure, for callers that branch on it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input { .. }
            | Self::Decode { .. }
            | Self::FileTooLarge { .. }
            | Self::ImageTooLarge { .. }
            | Self::UnsupportedFormat { .. }
            | Self::FileNotFound(_) => ErrorKind::Input,
            Self::ModelLoad { .. } => ErrorKind::ModelLoad,
            Self::Inference { .. } => ErrorKind::Inference,
            Self::UnsupportedDomain(_) => ErrorKind::UnsupportedDomain,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
        }
    }

    /// The pipeline stage that failed, if the error came from one.
    ///
    /// Model loading and file ingestion happen outside a pipeline run and
    /// report `None`.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Input { stage, .. } => Some(*stage),
            Self::Inference { .. } => Some(Stage::Classify),
            Self::DimensionMismatch { .. } => Some(Stage::Evaluate),
            Self::ImageTooLarge { .. } => Some(Stage::Validate),
            _ => None,
        }
    }

    /// Whether the caller can recover by retrying with different input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Input | ErrorKind::DimensionMismatch | ErrorKind::Inference
        )
    }
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_reports_stage() {
        let err = PipelineError::input(Stage::Enhance, "image has zero width");
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(err.stage(), Some(Stage::Enhance));
        assert!(err.to_string().contains("enhance stage"));
    }

    #[test]
    fn test_dimension_mismatch_is_evaluate_stage() {
        let shape = |w, h| Shape {
            width: w,
            height: h,
            channels: 3,
        };
        let err = PipelineError::DimensionMismatch {
            original: shape(10, 10),
            enhanced: shape(20, 10),
        };
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert_eq!(err.stage(), Some(Stage::Evaluate));
        assert!(err.to_string().contains("10x10x3"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_model_load_not_recoverable() {
        let err = PipelineError::ModelLoad {
            path: PathBuf::from("/models/visual.onnx"),
            message: "missing".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ModelLoad);
        assert_eq!(err.stage(), None);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_unsupported_domain_kind() {
        let err = PipelineError::UnsupportedDomain("portrait".to_string());
        assert_eq!(err.kind(), ErrorKind::UnsupportedDomain);
        assert!(!err.is_recoverable());
    }
}
