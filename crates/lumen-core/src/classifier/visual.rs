//! CLIP visual encoder session management and inference.
//!
//! Loads a CLIP vision tower exported to ONNX format and runs inference
//! to produce projected image embeddings in the shared image-text space.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

/// Output carrying the projected embedding in CLIP vision exports.
const EMBEDS_OUTPUT: &str = "image_embeds";

/// Wraps an ONNX Runtime session for the CLIP vision tower.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct ClipVisualSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Name of the output holding the projected embedding.
    output_name: String,
}

impl ClipVisualSession {
    /// Load a CLIP visual encoder from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::ModelLoad {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::ModelLoad {
                path: model_path.to_path_buf(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        // Some exports only carry the projection output under a generic name.
        let output_name = output_names
            .iter()
            .find(|name| name.as_str() == EMBEDS_OUTPUT)
            .or_else(|| output_names.first())
            .cloned()
            .ok_or_else(|| PipelineError::ModelLoad {
                path: model_path.to_path_buf(),
                message: "Visual encoder declares no outputs".to_string(),
            })?;

        tracing::debug!(
            "Loaded CLIP visual encoder from {:?} (input: {:?}, output: {:?}, all outputs: {:?})",
            model_path,
            input_name,
            output_name,
            output_names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    /// Run inference on a preprocessed image tensor and return the embedding.
    ///
    /// Input shape: \[1, 3, image_size, image_size\] (NCHW, CLIP-normalized).
    /// Output: L2-normalized embedding vector (512 floats for ViT-B/32).
    pub fn embed(&self, preprocessed: &Array4<f32>) -> Result<Vec<f32>, PipelineError> {
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| PipelineError::Inference {
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self.session.lock().map_err(|e| PipelineError::Inference {
            message: format!("Session lock poisoned: {e}"),
        })?;

        let outputs = session.run(inputs).map_err(|e| PipelineError::Inference {
            message: format!("ONNX inference failed: {e}"),
        })?;

        let embeds = outputs
            .iter()
            .find(|(name, _)| *name == self.output_name)
            .ok_or_else(|| PipelineError::Inference {
                message: format!("Model did not produce {}", self.output_name),
            })?;

        let (shape, data) =
            embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Inference {
                    message: format!("Failed to extract {} tensor: {e}", self.output_name),
                })?;

        // image_embeds is [1, dim]; extract the single embedding vector.
        let mut raw = match shape.len() {
            1 => data.to_vec(),
            2 => {
                let dim = shape[1] as usize;
                data[..dim].to_vec()
            }
            _ => {
                return Err(PipelineError::Inference {
                    message: format!("Unexpected {} shape: {:?}", self.output_name, shape),
                });
            }
        };

        crate::math::l2_normalize_in_place(&mut raw);
        Ok(raw)
    }
}
