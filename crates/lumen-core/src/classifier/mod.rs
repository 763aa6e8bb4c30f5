//! Zero-shot domain classification with CLIP.
//!
//! The image is embedded by the CLIP visual encoder and compared against one
//! text prompt per domain ("This is a {domain} image"). Prompt embeddings are
//! computed once at load time, so classifying an image costs a single
//! visual forward pass.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::classifier::{Classify, DomainClassifier};
//! use lumen_core::Config;
//!
//! let config = Config::default();
//! let classifier = DomainClassifier::load(&config.classifier, &config.model_dir())?;
//! let classification = classifier.classify(&image)?;
//! println!("{} ({:.2})", classification.domain, classification.confidence);
//! ```

pub(crate) mod preprocess;
pub(crate) mod scorer;
pub(crate) mod text;
pub(crate) mod visual;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::ClassifierConfig;
use crate::error::{PipelineError, Stage};
use crate::types::{Classification, Domain};

use self::preprocess::preprocess;
use self::scorer::PromptBank;
use self::text::ClipTextEncoder;
use self::visual::ClipVisualSession;

/// The visual encoder ONNX model filename.
pub const VISUAL_MODEL_FILENAME: &str = "visual.onnx";

/// The text encoder ONNX model filename.
pub const TEXT_MODEL_FILENAME: &str = "text_model.onnx";

/// The tokenizer filename.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Anything that can assign an image to a content domain.
///
/// The pipeline depends on this trait rather than on the CLIP classifier so
/// tests can substitute a fixed classifier.
pub trait Classify: Send + Sync {
    /// Classify an image. Never mutates the input.
    fn classify(&self, image: &DynamicImage) -> Result<Classification, PipelineError>;
}

/// CLIP zero-shot classifier over the configured domain labels.
pub struct DomainClassifier {
    session: ClipVisualSession,
    prompts: PromptBank,
    image_size: u32,
    logit_scale: f32,
}

impl DomainClassifier {
    /// Load the CLIP encoders from the model directory and embed the prompts.
    ///
    /// Expects `visual.onnx`, `text_model.onnx` and `tokenizer.json` at
    /// `{model_dir}/{model_name}/`.
    pub fn load(config: &ClassifierConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let domains = resolve_domains(&config.domains)?;
        let paths = ModelPaths::new(config, model_dir);

        for path in paths.all() {
            if !path.exists() {
                return Err(PipelineError::ModelLoad {
                    path: path.to_path_buf(),
                    message: "Model file not found. Run `lumen models download` first."
                        .to_string(),
                });
            }
        }

        tracing::info!("Loading CLIP model from {:?}", paths.dir);
        let session = ClipVisualSession::load(&paths.visual)?;

        let prompts: Vec<String> = config
            .domains
            .iter()
            .map(|label| config.prompt_for(label.trim()))
            .collect();
        tracing::debug!("Encoding domain prompts: {:?}", prompts);

        // The text encoder is only needed here; it is dropped once the
        // prompt embeddings exist.
        let embeddings = {
            let encoder =
                ClipTextEncoder::load(&paths.text, &paths.tokenizer, config.max_text_length)?;
            encoder.encode_batch(&prompts)?
        };
        let prompts = PromptBank::new(domains, embeddings)?;
        tracing::info!(
            "CLIP model loaded ({} domains, {}-dim embeddings)",
            prompts.domains().len(),
            prompts.embedding_dim()
        );

        Ok(Self {
            session,
            prompts,
            image_size: config.image_size,
            logit_scale: config.logit_scale,
        })
    }

    /// Domains this classifier can return, in configured order.
    pub fn domains(&self) -> &[Domain] {
        self.prompts.domains()
    }

    /// Check whether all model files exist on disk.
    pub fn model_exists(config: &ClassifierConfig, model_dir: &Path) -> bool {
        ModelPaths::new(config, model_dir)
            .all()
            .iter()
            .all(|p| p.exists())
    }
}

impl Classify for DomainClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Classification, PipelineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::input(Stage::Classify, "image has no pixels"));
        }
        let tensor = preprocess(image, self.image_size);
        let embedding = self.session.embed(&tensor)?;
        self.prompts.score(&embedding, self.logit_scale)
    }
}

/// Resolved locations of the model files.
struct ModelPaths {
    dir: PathBuf,
    visual: PathBuf,
    text: PathBuf,
    tokenizer: PathBuf,
}

impl ModelPaths {
    fn new(config: &ClassifierConfig, model_dir: &Path) -> Self {
        let dir = model_dir.join(&config.model);
        Self {
            visual: dir.join(VISUAL_MODEL_FILENAME),
            text: dir.join(TEXT_MODEL_FILENAME),
            tokenizer: dir.join(TOKENIZER_FILENAME),
            dir,
        }
    }

    fn all(&self) -> [&Path; 3] {
        [
            self.visual.as_path(),
            self.text.as_path(),
            self.tokenizer.as_path(),
        ]
    }
}

/// Map configured labels onto domains.
///
/// Every label must name a domain with an enhancement branch, and every
/// branch must be named exactly once.
pub fn resolve_domains(labels: &[String]) -> Result<Vec<Domain>, PipelineError> {
    let mut seen = HashSet::new();
    let mut domains = Vec::with_capacity(labels.len());

    for label in labels {
        let domain: Domain = label.parse()?;
        if !seen.insert(domain) {
            return Err(PipelineError::UnsupportedDomain(format!(
                "{domain} is listed more than once"
            )));
        }
        domains.push(domain);
    }

    if let Some(missing) = Domain::ALL.iter().find(|d| !seen.contains(*d)) {
        return Err(PipelineError::UnsupportedDomain(format!(
            "no label configured for {missing}"
        )));
    }

    Ok(domains)
}
