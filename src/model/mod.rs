//! Neural network architecture

pub mod classifier;

pub use classifier::{ClassifierConfig, GenreClassifier};
