//! Model training
//!
//! Training loop, loss, metrics tracking and evaluation.

pub mod confusion;
pub mod evaluate;
pub mod metrics;
pub mod trainer;

pub use confusion::ConfusionMatrix;
pub use evaluate::evaluate;
pub use metrics::{Metrics, TrainingHistory};
pub use trainer::ClassifierTrainer;
