//! Genre inference for single embedding files

use std::path::Path;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::data::embedding::load_embedding;
use crate::model::{ClassifierConfig, GenreClassifier};
use crate::{Genre, GenreError, Result};

/// Probability assigned to one genre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenrePrediction {
    pub genre: Genre,
    pub probability: f32,
}

/// Predictor wrapping a trained classifier
pub struct GenrePredictor<B: Backend> {
    model: GenreClassifier<B>,
    embedding_dim: usize,
    device: B::Device,
}

impl<B: Backend> GenrePredictor<B> {
    pub fn new(model: GenreClassifier<B>, embedding_dim: usize, device: B::Device) -> Self {
        GenrePredictor {
            model,
            embedding_dim,
            device,
        }
    }

    /// Load predictor from a saved model
    pub fn load(model_path: &Path, config: ClassifierConfig, device: B::Device) -> Result<Self> {
        // The recorder stores weights under `<path>.mpk`
        if !model_path.with_extension("mpk").exists() {
            return Err(GenreError::NoModel);
        }
        let model = GenreClassifier::load(&device, model_path, &config)?;
        Ok(Self::new(model, config.embedding_dim, device))
    }

    /// Probabilities for every genre, highest first
    pub fn predict(&self, embedding: &[f32]) -> Result<Vec<GenrePrediction>> {
        if embedding.len() != self.embedding_dim {
            return Err(GenreError::EmbeddingShape {
                path: "<input>".into(),
                expected: self.embedding_dim,
                found: embedding.len(),
            });
        }

        let input = Tensor::<B, 1>::from_floats(embedding, &self.device)
            .reshape([1, self.embedding_dim]);
        let probs = self
            .model
            .predict_proba(input)
            .into_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .map_err(|e| GenreError::Model(format!("Failed to read probabilities: {:?}", e)))?;

        let mut predictions: Vec<GenrePrediction> = Genre::ALL
            .iter()
            .zip(probs)
            .map(|(genre, probability)| GenrePrediction {
                genre: *genre,
                probability,
            })
            .collect();
        predictions.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        Ok(predictions)
    }

    /// Classify the embedding stored in a `.npy` file
    pub fn predict_file(&self, path: &Path) -> Result<Vec<GenrePrediction>> {
        let embedding = load_embedding(path, self.embedding_dim)?;
        self.predict(&embedding)
    }
}
