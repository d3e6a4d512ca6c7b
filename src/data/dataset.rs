//! Burn Dataset implementation for labeled embedding files
//!
//! Turns a directory of `.npy` embeddings into labeled samples and batches
//! them into tensors for training.

use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use crate::data::embedding::load_embedding;
use crate::data::labels::{infer_genre, one_hot};
use crate::{Genre, GenreError, Result};

/// A single labeled embedding
#[derive(Debug, Clone)]
pub struct EmbeddingSample {
    pub embedding: Vec<f32>,
    pub genre: Genre,
    /// File the embedding was loaded from
    pub path: PathBuf,
}

/// Labeled embeddings loaded from one directory
#[derive(Debug, Clone)]
pub struct EmbeddingDataset {
    samples: Vec<EmbeddingSample>,
    embedding_dim: usize,
}

impl EmbeddingDataset {
    /// Load every `.npy` file in `dir`, labeling each from its file name.
    ///
    /// Files are visited in file-name order so the dataset is deterministic.
    pub fn from_dir(dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "npy"))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(GenreError::EmptyDataset(dir.to_path_buf()));
        }

        let samples = paths
            .into_iter()
            .map(|path| {
                let genre = infer_genre(&path)?;
                let embedding = load_embedding(&path, embedding_dim)?;
                Ok(EmbeddingSample {
                    embedding,
                    genre,
                    path,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let dataset = EmbeddingDataset {
            samples,
            embedding_dim,
        };
        log::info!(
            "Loaded {} embeddings from {} ({})",
            dataset.len(),
            dir.display(),
            dataset.class_summary()
        );

        Ok(dataset)
    }

    /// Create a dataset from pre-built samples
    pub fn from_samples(samples: Vec<EmbeddingSample>, embedding_dim: usize) -> Result<Self> {
        if let Some(bad) = samples.iter().find(|s| s.embedding.len() != embedding_dim) {
            return Err(GenreError::EmbeddingShape {
                path: bad.path.clone(),
                expected: embedding_dim,
                found: bad.embedding.len(),
            });
        }
        Ok(EmbeddingDataset {
            samples,
            embedding_dim,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn samples(&self) -> &[EmbeddingSample] {
        &self.samples
    }

    /// Number of samples per genre, in class-index order
    pub fn class_counts(&self) -> [usize; Genre::COUNT] {
        let mut counts = [0; Genre::COUNT];
        for sample in &self.samples {
            counts[sample.genre.index()] += 1;
        }
        counts
    }

    fn class_summary(&self) -> String {
        Genre::ALL
            .iter()
            .zip(self.class_counts())
            .filter(|(_, n)| *n > 0)
            .map(|(g, n)| format!("{}={}", g, n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Embeddings as rows of a matrix
    pub fn embeddings(&self) -> Vec<Vec<f32>> {
        self.samples.iter().map(|s| s.embedding.clone()).collect()
    }

    pub fn labels(&self) -> Vec<Genre> {
        self.samples.iter().map(|s| s.genre).collect()
    }
}

impl Dataset<EmbeddingSample> for EmbeddingDataset {
    fn get(&self, index: usize) -> Option<EmbeddingSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Batch of embeddings for training
#[derive(Debug, Clone)]
pub struct EmbeddingBatch<B: Backend> {
    /// Embeddings: [batch, embedding_dim]
    pub embeddings: Tensor<B, 2>,
    /// Class indices: [batch]
    pub targets: Tensor<B, 1, Int>,
    /// One-hot labels: [batch, num_classes]
    pub one_hot: Tensor<B, 2>,
}

/// Batcher for creating training batches
#[derive(Clone)]
pub struct EmbeddingBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> EmbeddingBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        EmbeddingBatcher { device }
    }
}

impl<B: Backend> Batcher<B, EmbeddingSample, EmbeddingBatch<B>> for EmbeddingBatcher<B> {
    fn batch(&self, items: Vec<EmbeddingSample>, _device: &B::Device) -> EmbeddingBatch<B> {
        let batch_size = items.len();
        let dim = items.first().map(|s| s.embedding.len()).unwrap_or(0);

        let mut embedding_data = Vec::with_capacity(batch_size * dim);
        let mut target_data = Vec::with_capacity(batch_size);
        let mut one_hot_data = Vec::with_capacity(batch_size * Genre::COUNT);

        for sample in &items {
            embedding_data.extend_from_slice(&sample.embedding);
            target_data.push(sample.genre.index() as i64);
            one_hot_data.extend(one_hot(sample.genre));
        }

        let embeddings = Tensor::<B, 1>::from_floats(embedding_data.as_slice(), &self.device)
            .reshape([batch_size, dim]);
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(target_data, [batch_size]),
            &self.device,
        );
        let one_hot = Tensor::<B, 1>::from_floats(one_hot_data.as_slice(), &self.device)
            .reshape([batch_size, Genre::COUNT]);

        EmbeddingBatch {
            embeddings,
            targets,
            one_hot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::embedding::save_embedding;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn write_fixture(dir: &Path) {
        save_embedding(&dir.join("rock.00002.npy"), &[1.0, 0.0, 0.0]).unwrap();
        save_embedding(&dir.join("blues.00001.npy"), &[0.0, 1.0, 0.0]).unwrap();
        save_embedding(&dir.join("rock.00001.npy"), &[0.0, 0.0, 1.0]).unwrap();
        std::fs::write(dir.join("README.txt"), "not an embedding").unwrap();
    }

    #[test]
    fn test_from_dir_sorted_and_labeled() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let dataset = EmbeddingDataset::from_dir(dir.path(), 3).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.labels(), vec![Genre::Blues, Genre::Rock, Genre::Rock]);
        assert_eq!(dataset.samples()[1].embedding, vec![0.0, 0.0, 1.0]);

        let counts = dataset.class_counts();
        assert_eq!(counts[Genre::Rock.index()], 2);
        assert_eq!(counts[Genre::Blues.index()], 1);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_from_dir_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmbeddingDataset::from_dir(dir.path(), 3).unwrap_err();
        assert!(matches!(err, GenreError::EmptyDataset(_)));
    }

    #[test]
    fn test_from_dir_unlabeled_file() {
        let dir = tempfile::tempdir().unwrap();
        save_embedding(&dir.path().join("track_01.npy"), &[1.0, 2.0, 3.0]).unwrap();
        let err = EmbeddingDataset::from_dir(dir.path(), 3).unwrap_err();
        assert!(matches!(err, GenreError::UnknownGenre(_)));
    }

    #[test]
    fn test_from_samples_rejects_wrong_dim() {
        let sample = EmbeddingSample {
            embedding: vec![1.0, 2.0],
            genre: Genre::Pop,
            path: PathBuf::from("pop.npy"),
        };
        assert!(EmbeddingDataset::from_samples(vec![sample], 3).is_err());
    }

    #[test]
    fn test_batcher_shapes() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let dataset = EmbeddingDataset::from_dir(dir.path(), 3).unwrap();

        let device = <TestBackend as Backend>::Device::default();
        let batcher = EmbeddingBatcher::<TestBackend>::new(device.clone());
        let items: Vec<_> = (0..dataset.len()).filter_map(|i| dataset.get(i)).collect();
        let batch = batcher.batch(items, &device);

        assert_eq!(batch.embeddings.dims(), [3, 3]);
        assert_eq!(batch.targets.dims(), [3]);
        assert_eq!(batch.one_hot.dims(), [3, Genre::COUNT]);

        let one_hot_sum: f32 = batch.one_hot.sum().into_scalar();
        assert_eq!(one_hot_sum, 3.0);

        let targets = batch.targets.into_data().convert::<i64>();
        assert_eq!(
            targets.as_slice::<i64>().unwrap(),
            &[
                Genre::Blues.index() as i64,
                Genre::Rock.index() as i64,
                Genre::Rock.index() as i64
            ]
        );
    }
}
