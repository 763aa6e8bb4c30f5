//! CLIP text encoder for embedding the domain prompts.
//!
//! Loads the CLIP text ONNX model and tokenizer, encodes prompt strings
//! to vectors aligned with the visual encoder's space. Prompts are encoded
//! once at classifier load time; the session is dropped afterwards.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

/// Output carrying the projected embedding in CLIP text exports.
const EMBEDS_OUTPUT: &str = "text_embeds";

/// CLIP's end-of-text token, also used for padding.
const END_OF_TEXT: &str = "<|endoftext|>";

/// Id of `<|endoftext|>` in the stock CLIP vocabulary.
const END_OF_TEXT_ID: u32 = 49407;

/// CLIP text encoder wrapper.
///
/// Uses the same `Mutex<Session>` pattern as the visual encoder.
pub struct ClipTextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    max_length: usize,
    pad_id: u32,
    wants_attention_mask: bool,
    output_name: String,
}

impl ClipTextEncoder {
    /// Load the text encoder and tokenizer.
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        max_length: usize,
    ) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::ModelLoad {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::ModelLoad {
                path: model_path.to_path_buf(),
                message: format!("Failed to load text encoder model: {e}"),
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path).map_err(|e| {
            PipelineError::ModelLoad {
                path: tokenizer_path.to_path_buf(),
                message: format!("Failed to load tokenizer: {e}"),
            }
        })?;

        let pad_id = tokenizer
            .token_to_id(END_OF_TEXT)
            .unwrap_or(END_OF_TEXT_ID);

        let wants_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        let output_name = output_names
            .iter()
            .find(|name| name.as_str() == EMBEDS_OUTPUT)
            .or_else(|| output_names.first())
            .cloned()
            .ok_or_else(|| PipelineError::ModelLoad {
                path: model_path.to_path_buf(),
                message: "Text encoder declares no outputs".to_string(),
            })?;

        tracing::debug!(
            "Loaded CLIP text encoder (inputs: {:?}, output: {:?})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length,
            pad_id,
            wants_attention_mask,
            output_name,
        })
    }

    /// Encode a batch of prompts to normalized embeddings, one per prompt.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = texts.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }
        let max_length = self.max_length;

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| PipelineError::Inference {
                message: format!("Tokenization failed: {e}"),
            })?;

        let (input_ids, attention_mask) = pack_token_ids(
            encodings.iter().map(|e| e.get_ids()),
            batch_size,
            max_length,
            self.pad_id,
        );

        let shape = vec![batch_size as i64, max_length as i64];
        let input_ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| PipelineError::Inference {
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Inference {
            message: format!("Text encoder lock poisoned: {e}"),
        })?;

        let run = if self.wants_attention_mask {
            let mask_value =
                Value::from_array((shape, attention_mask)).map_err(|e| PipelineError::Inference {
                    message: format!("Failed to create attention mask tensor: {e}"),
                })?;
            session.run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => input_ids_value])
        };
        let outputs = run.map_err(|e| PipelineError::Inference {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        let embeds = outputs
            .iter()
            .find(|(name, _)| *name == self.output_name)
            .ok_or_else(|| PipelineError::Inference {
                message: format!("Text encoder did not produce {}", self.output_name),
            })?;

        let (_shape, data) =
            embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Inference {
                    message: format!("Failed to extract {}: {e}", self.output_name),
                })?;

        if data.is_empty() || data.len() % batch_size != 0 {
            return Err(PipelineError::Inference {
                message: format!(
                    "Text embedding output of {} floats does not split into {} prompts",
                    data.len(),
                    batch_size
                ),
            });
        }
        let dim = data.len() / batch_size;

        Ok(data.chunks(dim).map(crate::math::l2_normalize).collect())
    }
}

/// Lay token ids out as a `[batch, max_length]` matrix padded with `pad_id`,
/// plus the matching attention mask. Sequences longer than `max_length`
/// are truncated.
fn pack_token_ids<'a>(
    sequences: impl Iterator<Item = &'a [u32]>,
    batch_size: usize,
    max_length: usize,
    pad_id: u32,
) -> (Vec<i64>, Vec<i64>) {
    let mut input_ids = vec![pad_id as i64; batch_size * max_length];
    let mut attention_mask = vec![0i64; batch_size * max_length];

    for (i, ids) in sequences.enumerate().take(batch_size) {
        for (j, &id) in ids.iter().take(max_length).enumerate() {
            input_ids[i * max_length + j] = id as i64;
            attention_mask[i * max_length + j] = 1;
        }
    }

    (input_ids, attention_mask)
}
