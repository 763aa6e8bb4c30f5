//! Core data types for the Lumen enhancement pipeline.
//!
//! These types represent the output of running an image through the
//! classify → enhance → evaluate pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Content domain that drives the choice of enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Product photography: detail and color fidelity
    Product,
    /// Scanned documents: text legibility
    Document,
    /// Landscape photography: vivid natural scenes
    Landscape,
}

impl Domain {
    /// Every domain, in canonical order.
    pub const ALL: [Domain; 3] = [Domain::Product, Domain::Document, Domain::Landscape];

    /// Lowercase label used in prompts, config and output.
    pub fn label(self) -> &'static str {
        match self {
            Domain::Product => "product",
            Domain::Document => "document",
            Domain::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Domain {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "product" => Ok(Domain::Product),
            "document" => Ok(Domain::Document),
            "landscape" => Ok(Domain::Landscape),
            other => Err(PipelineError::UnsupportedDomain(other.to_string())),
        }
    }
}

/// Softmax probability for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: Domain,
    pub probability: f32,
}

/// Result of classifying an image against the configured domain set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Best-matching domain
    pub domain: Domain,

    /// Softmax probability of `domain`, in [0, 1]
    pub confidence: f32,

    /// Probabilities for every configured domain, in configured order.
    /// They sum to 1.
    pub scores: Vec<DomainScore>,
}

impl Classification {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format_detection(self.domain, self.confidence)
    }
}

fn format_detection(domain: Domain, confidence: f32) -> String {
    format!("Detected: {} (Confidence: {:.2}%)", domain, confidence * 100.0)
}

/// Quality metrics comparing an enhanced image with its original.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Peak signal-to-noise ratio in dB (ceiling value for identical images)
    pub psnr: f64,

    /// Mean structural similarity, approximately in [-1, 1]
    pub ssim: f64,

    /// Percentage change of mean grayscale intensity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness_change: Option<f64>,
}

/// Everything the pipeline produces for one image.
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    /// The enhanced image (Luma8 for documents, Rgb8 otherwise)
    pub enhanced: DynamicImage,

    /// Domain chosen by the classifier
    pub domain: Domain,

    /// Classifier confidence for `domain`
    pub confidence: f32,

    /// Per-domain probabilities
    pub scores: Vec<DomainScore>,

    /// Quality metrics, if evaluation ran
    pub metrics: Option<QualityMetrics>,
}

impl EnhancementResult {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format_detection(self.domain, self.confidence)
    }
}

/// Serializable record of one processed file, for persistence by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementRecord {
    // === File Identification ===
    /// Path to the source file
    pub file_path: PathBuf,

    /// Just the filename portion
    pub file_name: String,

    /// BLAKE3 hash of the source bytes
    pub content_hash: String,

    // === Image Properties ===
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    // === Classification ===
    /// Domain chosen by the classifier
    pub domain: Domain,

    /// Classifier confidence for `domain`
    pub confidence: f32,

    /// Per-domain probabilities
    pub scores: Vec<DomainScore>,

    // === Enhancement ===
    /// Where the enhanced image was written, if it was saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_path: Option<PathBuf>,

    /// Quality metrics, if evaluation ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QualityMetrics>,

    /// Unix timestamp (seconds) when processing finished
    #[serde(default)]
    pub processed_at: u64,
}

/// Seconds since the Unix epoch, 0 if the clock is before it.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
