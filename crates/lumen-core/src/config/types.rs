//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.lumen/models"),
        }
    }
}

/// Domain classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Square input resolution expected by the visual encoder
    pub image_size: u32,

    /// Domain labels, one prompt each. Must name every domain exactly once.
    pub domains: Vec<String>,

    /// Prompt template; `{domain}` is replaced by the label
    pub prompt_template: String,

    /// Multiplier applied to cosine similarities before softmax
    /// (CLIP's learned temperature, exp(4.6052) ≈ 100).
    pub logit_scale: f32,

    /// Token sequence length fed to the text encoder
    pub max_text_length: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-base-patch32".to_string(),
            image_size: 224,
            domains: vec![
                "product".to_string(),
                "document".to_string(),
                "landscape".to_string(),
            ],
            prompt_template: "This is a {domain} image".to_string(),
            logit_scale: 100.0,
            max_text_length: 77,
        }
    }
}

impl ClassifierConfig {
    /// Render the prompt for one domain label.
    pub fn prompt_for(&self, label: &str) -> String {
        self.prompt_template.replace("{domain}", label)
    }
}

/// Contrast-limited adaptive histogram equalization settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheConfig {
    /// Contrast limit relative to a uniform histogram
    pub clip_limit: f32,

    /// Tile grid as [columns, rows]
    pub tile_grid: [u32; 2],
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: [8, 8],
        }
    }
}

/// Non-local-means denoising settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Filter strength for luminance (or the single gray channel)
    pub h: f32,

    /// Filter strength for the two chroma channels (color images only)
    pub h_color: f32,

    /// Side of the square patch compared between pixels (odd)
    pub template_window: u32,

    /// Side of the square search area around each pixel (odd)
    pub search_window: u32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            h: 3.0,
            h_color: 3.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

/// Product enhancement: Lab CLAHE → sharpen → color denoise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Equalization of the lightness channel
    pub clahe: ClaheConfig,

    /// 3×3 sharpening kernel, row-major. Weights should sum to 1.
    pub sharpen_kernel: [f32; 9],

    /// Denoising applied after sharpening
    pub denoise: DenoiseConfig,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            clahe: ClaheConfig {
                clip_limit: 3.0,
                tile_grid: [8, 8],
            },
            sharpen_kernel: [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0],
            denoise: DenoiseConfig::default(),
        }
    }
}

/// How a document is reduced to black and white.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BinarizeMethod {
    /// Global threshold chosen by Otsu's method
    #[default]
    Otsu,
    /// Gaussian-weighted local mean over a `(2r+1)²` block, minus `offset`
    Adaptive { block_radius: u32, offset: i32 },
}

/// Document enhancement: grayscale → binarize → denoise → optional CLAHE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Binarization method
    pub binarize: BinarizeMethod,

    /// Denoising of the binary image (`h_color` unused)
    pub denoise: DenoiseConfig,

    /// Final contrast equalization; `None` disables it
    pub clahe: Option<ClaheConfig>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            binarize: BinarizeMethod::Otsu,
            denoise: DenoiseConfig::default(),
            clahe: Some(ClaheConfig::default()),
        }
    }
}

/// Landscape enhancement: HSV saturation gain + CLAHE on V → color denoise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeConfig {
    /// Multiplier applied to the saturation channel (clipped to 255)
    pub saturation_gain: f32,

    /// Equalization of the value channel
    pub clahe: ClaheConfig,

    /// Denoising applied last
    pub denoise: DenoiseConfig,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            saturation_gain: 1.2,
            clahe: ClaheConfig::default(),
            denoise: DenoiseConfig::default(),
        }
    }
}

/// Per-domain enhancement constants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub product: ProductConfig,
    pub document: DocumentConfig,
    pub landscape: LandscapeConfig,
}

/// What to do when the enhanced image has a different channel count
/// than the original (documents come back single-channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMismatchPolicy {
    /// Compare grayscale versions of both images
    #[default]
    Grayscale,
    /// Do not compute metrics
    Skip,
}

/// Structural similarity settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimConfig {
    /// Side of the square uniform window (odd)
    pub window: u32,

    /// Luminance stabilizer coefficient
    pub k1: f64,

    /// Contrast stabilizer coefficient
    pub k2: f64,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            window: 7,
            k1: 0.01,
            k2: 0.03,
        }
    }
}

/// Quality evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Whether the pipeline computes metrics by default
    pub enabled: bool,

    /// PSNR reported for identical images
    pub psnr_ceiling: f64,

    /// SSIM window and constants
    pub ssim: SsimConfig,

    /// Whether to report the mean brightness change
    pub brightness_change: bool,

    /// Handling of original/enhanced channel-count mismatch
    pub channel_mismatch: ChannelMismatchPolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            psnr_ceiling: 100.0,
            ssim: SsimConfig::default(),
            brightness_change: true,
            channel_mismatch: ChannelMismatchPolicy::Grayscale,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Wall-clock limit for one pipeline run, enforced by the CLI
    pub pipeline_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            pipeline_timeout_ms: 120_000,
        }
    }
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "bmp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
                "gif".to_string(),
            ],
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Directory enhanced images are written to
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
            dir: PathBuf::from("enhanced_images"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
