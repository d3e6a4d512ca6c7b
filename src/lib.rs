//! Music genre classification on precomputed audio embeddings
//!
//! A small feed-forward classifier trained on per-track embedding vectors,
//! with diagnostic plots (training curves, confusion matrix, t-SNE).

pub mod analysis;
pub mod data;
pub mod model;
pub mod predict;
pub mod training;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A GTZAN music genre
///
/// Declaration order is the class index used for one-hot labels,
/// confusion-matrix axes and plot palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Blues,
    Reggae,
    Metal,
    Rock,
    Pop,
    Classical,
    Country,
    Disco,
    Jazz,
    HipHop,
}

impl Genre {
    /// Number of classes
    pub const COUNT: usize = 10;

    /// All genres in class-index order
    pub const ALL: [Genre; Genre::COUNT] = [
        Genre::Blues,
        Genre::Reggae,
        Genre::Metal,
        Genre::Rock,
        Genre::Pop,
        Genre::Classical,
        Genre::Country,
        Genre::Disco,
        Genre::Jazz,
        Genre::HipHop,
    ];

    /// Class index
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Lowercase name, as it appears in embedding file names
    pub fn name(&self) -> &'static str {
        match self {
            Genre::Blues => "blues",
            Genre::Reggae => "reggae",
            Genre::Metal => "metal",
            Genre::Rock => "rock",
            Genre::Pop => "pop",
            Genre::Classical => "classical",
            Genre::Country => "country",
            Genre::Disco => "disco",
            Genre::Jazz => "jazz",
            Genre::HipHop => "hiphop",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Genre {
    type Err = GenreError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        Genre::ALL
            .iter()
            .copied()
            .find(|g| g.name() == lower)
            .ok_or_else(|| GenreError::Parse(format!("Unknown genre: {}", s)))
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GenreError {
    #[error("No genre name found in file name: {}", .0.display())]
    UnknownGenre(PathBuf),

    #[error("Embedding {} has {found} values, expected {expected}", .path.display())]
    EmbeddingShape {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("No embedding files found in {}", .0.display())]
    EmptyDataset(PathBuf),

    #[error("Failed to read embedding file: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("Failed to write embedding file: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error("Model not trained - run `genre train` first")]
    NoModel,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("t-SNE error: {0}")]
    Tsne(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, GenreError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
    pub tsne: TsneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Epochs without validation improvement before stopping (0 = never)
    pub early_stopping_patience: usize,
    pub seed: u64,
    /// Train on the wgpu backend instead of the CPU
    pub use_gpu: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Length of each embedding vector
    pub embedding_dim: usize,
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub train_embeddings: String,
    pub test_embeddings: String,
    pub plots_dir: String,
    pub model_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsneConfig {
    pub perplexity: f64,
    pub iterations: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            training: TrainingConfig {
                epochs: 50,
                batch_size: 32,
                learning_rate: 1e-3,
                early_stopping_patience: 0,
                seed: 42,
                use_gpu: false,
            },
            model: ModelConfig {
                embedding_dim: 128,
                hidden_dims: vec![64, 128, 256],
                dropout: 0.0,
            },
            data: DataConfig {
                train_embeddings: "data/embeddings/train".to_string(),
                test_embeddings: "data/embeddings/test".to_string(),
                plots_dir: "results/classifier".to_string(),
                model_path: "model/genre_classifier".to_string(),
            },
            tsne: TsneConfig {
                perplexity: 30.0,
                iterations: 1000,
                learning_rate: 200.0,
                seed: 42,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenreError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| GenreError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GenreError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
