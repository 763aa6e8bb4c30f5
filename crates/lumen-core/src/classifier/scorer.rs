//! Zero-shot scoring of an image embedding against the domain prompts.
//!
//! Cosine similarities are scaled by CLIP's logit scale and turned into a
//! probability distribution over the configured domains with softmax.

use ndarray::{Array2, ArrayView1};

use crate::error::PipelineError;
use crate::math::{argmax, softmax};
use crate::types::{Classification, Domain, DomainScore};

/// Normalized prompt embeddings, one row per domain in configured order.
pub struct PromptBank {
    domains: Vec<Domain>,
    matrix: Array2<f32>,
}

impl PromptBank {
    /// Build a bank from per-domain prompt embeddings.
    ///
    /// Embeddings must already be L2-normalized and share one dimension.
    pub fn new(domains: Vec<Domain>, embeddings: Vec<Vec<f32>>) -> Result<Self, PipelineError> {
        if domains.is_empty() || domains.len() != embeddings.len() {
            return Err(PipelineError::Inference {
                message: format!(
                    "Expected one prompt embedding per domain ({} domains, {} embeddings)",
                    domains.len(),
                    embeddings.len()
                ),
            });
        }

        let dim = embeddings[0].len();
        if embeddings.iter().any(|e| e.len() != dim) {
            return Err(PipelineError::Inference {
                message: "Prompt embeddings have inconsistent dimensions".to_string(),
            });
        }

        let flat: Vec<f32> = embeddings.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((domains.len(), dim), flat).map_err(|e| {
            PipelineError::Inference {
                message: format!("Failed to build prompt matrix: {e}"),
            }
        })?;

        Ok(Self { domains, matrix })
    }

    /// Embedding dimension of the bank.
    pub fn embedding_dim(&self) -> usize {
        self.matrix.ncols()
    }

    /// Domains in row order.
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    /// Score a normalized image embedding.
    ///
    /// `logit_i = logit_scale * cosine(image, prompt_i)`, then softmax.
    /// Ties resolve to the earliest configured domain.
    pub fn score(
        &self,
        image_embedding: &[f32],
        logit_scale: f32,
    ) -> Result<Classification, PipelineError> {
        if image_embedding.len() != self.embedding_dim() {
            return Err(PipelineError::Inference {
                message: format!(
                    "Image embedding has {} dimensions, prompts have {}",
                    image_embedding.len(),
                    self.embedding_dim()
                ),
            });
        }

        let cosines = self.matrix.dot(&ArrayView1::from(image_embedding));
        let logits: Vec<f32> = cosines.iter().map(|c| c * logit_scale).collect();
        let probabilities = softmax(&logits);

        let best = argmax(&probabilities).ok_or_else(|| PipelineError::Inference {
            message: "No domain scores produced".to_string(),
        })?;

        let scores = self
            .domains
            .iter()
            .zip(&probabilities)
            .map(|(&domain, &probability)| DomainScore {
                domain,
                probability,
            })
            .collect();

        Ok(Classification {
            domain: self.domains[best],
            confidence: probabilities[best],
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_bank() -> PromptBank {
        PromptBank::new(
            vec![Domain::Product, Domain::Document, Domain::Landscape],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_score_picks_closest_prompt() {
        let bank = axis_bank();
        let result = bank.score(&[0.1, 0.2, 0.97], 100.0).unwrap();
        assert_eq!(result.domain, Domain::Landscape);
        assert!(result.confidence > 0.99);
        assert_eq!(result.scores.len(), 3);
    }

    #[test]
    fn test_scores_sum_to_one_in_configured_order() {
        let bank = axis_bank();
        let result = bank.score(&[0.5, 0.6, 0.62], 100.0).unwrap();
        let sum: f32 = result.scores.iter().map(|s| s.probability).sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let order: Vec<Domain> = result.scores.iter().map(|s| s.domain).collect();
        assert_eq!(order, vec![Domain::Product, Domain::Document, Domain::Landscape]);
        assert!(result.scores.iter().all(|s| (0.0..=1.0).contains(&s.probability)));
    }

    #[test]
    fn test_tie_resolves_to_first_domain() {
        let bank = axis_bank();
        let v = 1.0 / 3.0f32.sqrt();
        let result = bank.score(&[v, v, v], 100.0).unwrap();
        assert_eq!(result.domain, Domain::Product);
        assert!((result.confidence - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_confidence_matches_chosen_score() {
        let bank = axis_bank();
        let result = bank.score(&[0.3, 0.8, 0.1], 10.0).unwrap();
        let chosen = result
            .scores
            .iter()
            .find(|s| s.domain == result.domain)
            .unwrap();
        assert_eq!(chosen.probability, result.confidence);
    }

    #[test]
    fn test_dimension_mismatch_is_inference_error() {
        let bank = axis_bank();
        let err = bank.score(&[1.0, 0.0], 100.0).unwrap_err();
        assert!(matches!(err, PipelineError::Inference { .. }));
    }

    #[test]
    fn test_new_rejects_count_mismatch() {
        let result = PromptBank::new(vec![Domain::Product], vec![]);
        assert!(result.is_err());
    }
}
