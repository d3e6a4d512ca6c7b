//! Prediction and inference
//!
//! Load a trained classifier and label new embeddings.

pub mod inference;

pub use inference::{GenrePrediction, GenrePredictor};
