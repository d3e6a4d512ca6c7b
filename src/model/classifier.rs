//! Feed-forward genre classifier
//!
//! Architecture: Input(embedding_dim) → Dense(64)  → ReLU
//!                                    → Dense(128) → ReLU
//!                                    → Dense(256) → ReLU
//!                                    → Dense(num_classes)

use std::path::Path;

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::{Genre, GenreError, ModelConfig, Result};

/// Configuration for the classifier
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Input dimension (embedding length)
    pub embedding_dim: usize,
    /// Hidden layer widths, applied in order
    pub hidden_dims: Vec<usize>,
    pub num_classes: usize,
    pub dropout: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            embedding_dim: 128,
            hidden_dims: vec![64, 128, 256],
            num_classes: Genre::COUNT,
            dropout: 0.0,
        }
    }
}

impl From<&ModelConfig> for ClassifierConfig {
    fn from(config: &ModelConfig) -> Self {
        ClassifierConfig {
            embedding_dim: config.embedding_dim,
            hidden_dims: config.hidden_dims.clone(),
            num_classes: Genre::COUNT,
            dropout: config.dropout,
        }
    }
}

/// A single hidden layer: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> DenseBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        DenseBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.linear.forward(x));
        self.dropout.forward(x)
    }
}

/// Multi-layer perceptron over embeddings
#[derive(Module, Debug)]
pub struct GenreClassifier<B: Backend> {
    hidden: Vec<DenseBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> GenreClassifier<B> {
    pub fn new(device: &B::Device, config: &ClassifierConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.embedding_dim;
        for &width in &config.hidden_dims {
            hidden.push(DenseBlock::new(device, in_dim, width, config.dropout));
            in_dim = width;
        }

        GenreClassifier {
            hidden,
            output: LinearConfig::new(in_dim, config.num_classes).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `embeddings` - [batch, embedding_dim]
    ///
    /// # Returns
    /// Class logits [batch, num_classes]
    pub fn forward(&self, embeddings: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(embeddings, |x, block| block.forward(x));
        self.output.forward(x)
    }

    /// Class probabilities [batch, num_classes]
    pub fn predict_proba(&self, embeddings: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(embeddings), 1)
    }

    /// Save model weights to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.to_path_buf())
            .map_err(|e| GenreError::Model(e.to_string()))
    }

    /// Load model weights from file
    pub fn load(device: &B::Device, path: &Path, config: &ClassifierConfig) -> Result<Self> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.to_path_buf(), device)
            .map_err(|e| GenreError::Model(e.to_string()))?;

        Ok(Self::new(device, config).load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let config = ClassifierConfig {
            embedding_dim: 16,
            ..Default::default()
        };
        let model = GenreClassifier::<TestBackend>::new(&device, &config);

        let x = Tensor::random([4, 16], burn::tensor::Distribution::Normal(0.0, 1.0), &device);
        let logits = model.forward(x);
        assert_eq!(logits.dims(), [4, Genre::COUNT]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let config = ClassifierConfig {
            embedding_dim: 8,
            hidden_dims: vec![12],
            ..Default::default()
        };
        let model = GenreClassifier::<TestBackend>::new(&device, &config);

        let x = Tensor::random([3, 8], burn::tensor::Distribution::Normal(0.0, 1.0), &device);
        let probs = model.predict_proba(x);
        let data = probs.to_data();
        let values = data.as_slice::<f32>().unwrap();

        for row in values.chunks(Genre::COUNT) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "row sums to {}", sum);
            assert!(row.iter().all(|p| *p >= 0.0));
        }
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("classifier");

        let device = Default::default();
        let config = ClassifierConfig {
            embedding_dim: 6,
            hidden_dims: vec![5, 4],
            ..Default::default()
        };
        let model = GenreClassifier::<TestBackend>::new(&device, &config);
        model.save(&path).unwrap();

        let loaded = GenreClassifier::<TestBackend>::load(&device, &path, &config).unwrap();

        let x = Tensor::<TestBackend, 2>::ones([2, 6], &device);
        let before = model.forward(x.clone()).into_data();
        let after = loaded.forward(x).into_data();
        let before = before.as_slice::<f32>().unwrap();
        let after = after.as_slice::<f32>().unwrap();
        for (a, b) in before.iter().zip(after) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
