//! The classify → enhance → evaluate orchestrator.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;

use crate::classifier::{Classify, DomainClassifier};
use crate::config::{ChannelMismatchPolicy, Config, LimitsConfig};
use crate::enhance::Enhancer;
use crate::error::{PipelineError, Stage};
use crate::evaluate::QualityEvaluator;
use crate::types::{Classification, EnhancementResult, QualityMetrics};

/// Per-run options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute quality metrics. `None` uses `evaluation.enabled`.
    pub evaluate: Option<bool>,
}

impl RunOptions {
    /// Options that skip evaluation.
    pub fn without_metrics() -> Self {
        Self {
            evaluate: Some(false),
        }
    }
}

/// Runs one image through classification, enhancement and evaluation.
///
/// The pipeline holds no per-image state; one instance can serve any number
/// of sequential or concurrent runs.
pub struct Pipeline {
    classifier: Arc<dyn Classify>,
    enhancer: Enhancer,
    evaluator: QualityEvaluator,
    limits: LimitsConfig,
}

impl Pipeline {
    /// Build a pipeline around an already constructed classifier.
    pub fn new(classifier: Arc<dyn Classify>, config: &Config) -> Self {
        Self {
            classifier,
            enhancer: Enhancer::new(config.enhancement.clone()),
            evaluator: QualityEvaluator::new(config.evaluation.clone()),
            limits: config.limits.clone(),
        }
    }

    /// Load the CLIP classifier from the configured model directory and
    /// build a pipeline around it.
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let classifier = DomainClassifier::load(&config.classifier, &config.model_dir())?;
        Ok(Self::new(Arc::new(classifier), config))
    }

    /// Classify an image without enhancing it.
    pub fn classify(&self, image: &DynamicImage) -> Result<Classification, PipelineError> {
        self.validate(image)?;
        self.classifier.classify(image)
    }

    /// Run the full pipeline on one image.
    ///
    /// Any stage failure is returned as-is; no partial result is produced.
    pub fn run(
        &self,
        image: &DynamicImage,
        options: &RunOptions,
    ) -> Result<EnhancementResult, PipelineError> {
        let start = Instant::now();
        self.validate(image)?;

        let classify_start = Instant::now();
        let classification = self.classifier.classify(image)?;
        tracing::trace!("  Classify: {:?}", classify_start.elapsed());

        let enhance_start = Instant::now();
        let enhanced = self.enhancer.enhance(image, classification.domain)?;
        tracing::trace!("  Enhance: {:?}", enhance_start.elapsed());

        let evaluate = options.evaluate.unwrap_or(self.evaluator.enabled());
        let metrics = if evaluate {
            let evaluate_start = Instant::now();
            let metrics = self.evaluate(image, &enhanced)?;
            tracing::trace!("  Evaluate: {:?}", evaluate_start.elapsed());
            metrics
        } else {
            None
        };

        tracing::debug!(
            "Enhanced as {} ({:.1}%) in {:?}",
            classification.domain,
            classification.confidence * 100.0,
            start.elapsed()
        );

        Ok(EnhancementResult {
            enhanced,
            domain: classification.domain,
            confidence: classification.confidence,
            scores: classification.scores,
            metrics,
        })
    }

    fn validate(&self, image: &DynamicImage) -> Result<(), PipelineError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(PipelineError::input(
                Stage::Validate,
                format!("image has no pixels ({width}x{height})"),
            ));
        }
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }

    /// Metrics for the pair, or `None` when the channel layouts differ and
    /// the policy is to skip such pairs.
    fn evaluate(
        &self,
        original: &DynamicImage,
        enhanced: &DynamicImage,
    ) -> Result<Option<QualityMetrics>, PipelineError> {
        let layouts_differ = original.color().has_color() != enhanced.color().has_color();
        if layouts_differ && self.evaluator.channel_mismatch() == ChannelMismatchPolicy::Skip {
            tracing::debug!("Skipping metrics: original and enhanced channel counts differ");
            return Ok(None);
        }
        self.evaluator.evaluate(original, enhanced).map(Some)
    }
}
