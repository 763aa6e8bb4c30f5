//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{ClaheConfig, Config, DenoiseConfig};

/// Tolerance for the sharpening kernel weight sum.
const KERNEL_SUM_TOLERANCE: f32 = 1e-3;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let classifier = &self.classifier;
        if classifier.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "classifier.image_size must be > 0".into(),
            ));
        }
        if classifier.domains.is_empty() {
            return Err(ConfigError::ValidationError(
                "classifier.domains must not be empty".into(),
            ));
        }
        if !classifier.prompt_template.contains("{domain}") {
            return Err(ConfigError::ValidationError(
                "classifier.prompt_template must contain {domain}".into(),
            ));
        }
        if !(classifier.logit_scale > 0.0) {
            return Err(ConfigError::ValidationError(
                "classifier.logit_scale must be > 0".into(),
            ));
        }
        if classifier.max_text_length == 0 {
            return Err(ConfigError::ValidationError(
                "classifier.max_text_length must be > 0".into(),
            ));
        }

        let product = &self.enhancement.product;
        validate_clahe("enhancement.product.clahe", &product.clahe)?;
        validate_denoise("enhancement.product.denoise", &product.denoise)?;
        let kernel_sum: f32 = product.sharpen_kernel.iter().sum();
        if (kernel_sum - 1.0).abs() > KERNEL_SUM_TOLERANCE {
            return Err(ConfigError::ValidationError(format!(
                "enhancement.product.sharpen_kernel weights must sum to 1 (got {kernel_sum})"
            )));
        }

        let document = &self.enhancement.document;
        validate_denoise("enhancement.document.denoise", &document.denoise)?;
        if let Some(clahe) = &document.clahe {
            validate_clahe("enhancement.document.clahe", clahe)?;
        }

        let landscape = &self.enhancement.landscape;
        validate_clahe("enhancement.landscape.clahe", &landscape.clahe)?;
        validate_denoise("enhancement.landscape.denoise", &landscape.denoise)?;
        if !(landscape.saturation_gain >= 0.0) {
            return Err(ConfigError::ValidationError(
                "enhancement.landscape.saturation_gain must be >= 0".into(),
            ));
        }

        let window = self.evaluation.ssim.window;
        if window < 3 || window % 2 == 0 {
            return Err(ConfigError::ValidationError(
                "evaluation.ssim.window must be an odd number >= 3".into(),
            ));
        }
        if !(self.evaluation.psnr_ceiling > 0.0) {
            return Err(ConfigError::ValidationError(
                "evaluation.psnr_ceiling must be > 0".into(),
            ));
        }

        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.pipeline_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.pipeline_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn validate_clahe(name: &str, clahe: &ClaheConfig) -> Result<(), ConfigError> {
    if !(clahe.clip_limit > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "{name}.clip_limit must be > 0"
        )));
    }
    if clahe.tile_grid.contains(&0) {
        return Err(ConfigError::ValidationError(format!(
            "{name}.tile_grid entries must be > 0"
        )));
    }
    Ok(())
}

fn validate_denoise(name: &str, denoise: &DenoiseConfig) -> Result<(), ConfigError> {
    if !(denoise.h > 0.0) || !(denoise.h_color > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "{name}.h and {name}.h_color must be > 0"
        )));
    }
    for (field, value) in [
        ("template_window", denoise.template_window),
        ("search_window", denoise.search_window),
    ] {
        if value == 0 || value % 2 == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name}.{field} must be a positive odd number"
            )));
        }
    }
    Ok(())
}
