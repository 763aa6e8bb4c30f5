//! Lumen Core - adaptive image enhancement library.
//!
//! Lumen decides what kind of picture it is looking at and enhances it
//! accordingly, then reports how much the enhancement changed it:
//!
//! ```text
//! Image → Classify (CLIP zero-shot) → Enhance (per domain) → Evaluate (PSNR/SSIM) → Result
//! ```
//!
//! Three domains are supported: product photos, document scans and
//! landscapes. Each maps to a fixed chain of classical image operations
//! (CLAHE, sharpening, non-local means denoising, binarization, saturation
//! gain) whose constants are all configurable.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::pipeline::ImageDecoder;
//! use lumen_core::{Config, Pipeline, RunOptions};
//! use std::path::Path;
//!
//! fn main() -> lumen_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = Pipeline::load(&config)?;
//!
//!     let decoder = ImageDecoder::new(config.limits.clone());
//!     let decoded = decoder.decode_file(Path::new("./receipt.jpg"))?;
//!     let result = pipeline.run(&decoded.image, &RunOptions::default())?;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```
//!
//! The classifier is injected as `Arc<dyn Classify>`, so embedders and tests
//! can run the pipeline with a classifier of their own.

// Module declarations
pub mod classifier;
pub mod config;
pub mod enhance;
pub mod error;
pub mod evaluate;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use classifier::{Classify, DomainClassifier};
pub use config::Config;
pub use enhance::Enhancer;
pub use error::{
    ConfigError, ErrorKind, LumenError, PipelineError, PipelineResult, Result, Shape, Stage,
};
pub use evaluate::QualityEvaluator;
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{Pipeline, RunOptions};
pub use types::{
    Classification, Domain, DomainScore, EnhancementRecord, EnhancementResult, QualityMetrics,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
