//! Training metrics and history

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Metrics accumulated over one pass through a dataset
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Sum of per-sample loss
    pub loss_sum: f64,
    /// Number of correct class predictions
    pub correct: usize,
    /// Total predictions
    pub total_predictions: usize,
    /// Number of batches accumulated
    pub batch_count: usize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update metrics with a batch result (`loss` is the batch mean)
    pub fn update(&mut self, loss: f32, correct: usize, batch_size: usize) {
        self.loss_sum += loss as f64 * batch_size as f64;
        self.correct += correct;
        self.total_predictions += batch_size;
        self.batch_count += 1;
    }

    /// Mean loss per sample
    pub fn avg_loss(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.loss_sum / self.total_predictions as f64
        }
    }

    /// Fraction of correct predictions
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct as f64 / self.total_predictions as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.4} | Acc: {:.2}%",
            self.avg_loss(),
            self.accuracy() * 100.0
        )
    }
}

/// Per-epoch training history
///
/// Serialized field names follow the usual `loss` / `val_loss` /
/// `accuracy` / `val_accuracy` convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingHistory {
    #[serde(rename = "loss")]
    pub train_losses: Vec<f64>,
    #[serde(rename = "val_loss")]
    pub val_losses: Vec<f64>,
    #[serde(rename = "accuracy")]
    pub train_accuracies: Vec<f64>,
    #[serde(rename = "val_accuracy")]
    pub val_accuracies: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
    pub trained_at: DateTime<Utc>,
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingHistory {
    pub fn new() -> Self {
        TrainingHistory {
            train_losses: Vec::new(),
            val_losses: Vec::new(),
            train_accuracies: Vec::new(),
            val_accuracies: Vec::new(),
            best_val_loss: f64::INFINITY,
            best_epoch: 0,
            trained_at: Utc::now(),
        }
    }

    /// Record metrics for an epoch, returning true if validation loss improved
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: &Metrics) -> bool {
        self.train_losses.push(train.avg_loss());
        self.val_losses.push(val.avg_loss());
        self.train_accuracies.push(train.accuracy());
        self.val_accuracies.push(val.accuracy());

        if val.avg_loss() < self.best_val_loss {
            self.best_val_loss = val.avg_loss();
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    /// Number of recorded epochs
    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }

    /// Check if we should early stop (`patience` 0 disables)
    pub fn should_early_stop(&self, patience: usize) -> bool {
        if patience == 0 || self.val_losses.is_empty() {
            return false;
        }
        let current_epoch = self.val_losses.len() - 1;
        current_epoch - self.best_epoch >= patience
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
