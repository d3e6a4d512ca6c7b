//! Embedding data
//!
//! Loading `.npy` embedding files, inferring genre labels from file names
//! and batching labeled samples for burn.

pub mod dataset;
pub mod embedding;
pub mod labels;
pub mod synthetic;

pub use dataset::{EmbeddingBatch, EmbeddingBatcher, EmbeddingDataset, EmbeddingSample};
pub use labels::infer_genre;
