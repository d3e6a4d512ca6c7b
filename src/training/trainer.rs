//! Training loop and loss computation

use burn::data::dataloader::DataLoaderBuilder;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use crate::data::{EmbeddingBatch, EmbeddingBatcher, EmbeddingDataset};
use crate::model::GenreClassifier;
use crate::training::evaluate::{argmax_classes, count_correct, int_tensor_to_vec};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{GenreError, Result};

/// Categorical cross-entropy between softmax(logits) and one-hot targets
pub fn categorical_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    one_hot: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (one_hot * log_probs).sum_dim(1).neg().mean()
}

/// Trainer for the genre classifier
pub struct ClassifierTrainer<B: AutodiffBackend> {
    model: GenreClassifier<B>,
    optimizer: OptimizerAdaptor<Adam, GenreClassifier<B>, B>,
    learning_rate: f64,
    seed: u64,
    device: B::Device,
}

impl<B: AutodiffBackend> ClassifierTrainer<B> {
    /// Create a new trainer with an Adam optimizer
    pub fn new(model: GenreClassifier<B>, learning_rate: f64, seed: u64, device: B::Device) -> Self {
        ClassifierTrainer {
            model,
            optimizer: AdamConfig::new().init(),
            learning_rate,
            seed,
            device,
        }
    }

    /// Fit on `train_dataset`, validating on `val_dataset` after every epoch.
    ///
    /// Returns the model with the lowest validation loss and the history.
    pub fn train(
        mut self,
        train_dataset: EmbeddingDataset,
        val_dataset: EmbeddingDataset,
        epochs: usize,
        batch_size: usize,
        early_stopping_patience: usize,
    ) -> Result<(GenreClassifier<B>, TrainingHistory)> {
        if epochs == 0 {
            return Err(GenreError::Config("epochs must be at least 1".to_string()));
        }
        if train_dataset.is_empty() || val_dataset.is_empty() {
            return Err(GenreError::Config(
                "training and validation sets must not be empty".to_string(),
            ));
        }

        let effective_batch_size = if batch_size == 0 {
            train_dataset.len()
        } else {
            batch_size.min(train_dataset.len())
        };

        let train_loader = DataLoaderBuilder::new(EmbeddingBatcher::<B>::new(self.device.clone()))
            .batch_size(effective_batch_size)
            .shuffle(self.seed)
            .build(train_dataset);

        let val_loader =
            DataLoaderBuilder::new(EmbeddingBatcher::<B::InnerBackend>::new(self.device.clone()))
                .batch_size(effective_batch_size)
                .build(val_dataset);

        let mut history = TrainingHistory::new();
        let mut best_model = self.model.clone();

        log::info!(
            "Starting training for {} epochs (batch size {}, lr {})",
            epochs,
            effective_batch_size,
            self.learning_rate
        );

        for epoch in 0..epochs {
            let train_metrics = self.train_epoch(train_loader.iter())?;
            let val_metrics = self.validate_epoch(val_loader.iter())?;

            let improved = history.record_epoch(epoch, &train_metrics, &val_metrics);

            log::info!(
                "Epoch {}/{}: Train: {} | Val: {}",
                epoch + 1,
                epochs,
                train_metrics,
                val_metrics
            );

            if improved {
                best_model = self.model.clone();
                log::debug!("  New best model (val_loss: {:.4})", val_metrics.avg_loss());
            }

            if history.should_early_stop(early_stopping_patience) {
                log::info!(
                    "Early stopping at epoch {} (best was epoch {})",
                    epoch + 1,
                    history.best_epoch + 1
                );
                break;
            }
        }

        Ok((best_model, history))
    }

    /// Train one epoch
    fn train_epoch(&mut self, loader: impl Iterator<Item = EmbeddingBatch<B>>) -> Result<Metrics> {
        let mut metrics = Metrics::new();

        for batch in loader {
            let batch_size = batch.embeddings.dims()[0];

            let logits = self.model.forward(batch.embeddings);
            let loss = categorical_cross_entropy(logits.clone(), batch.one_hot);
            let loss_val: f32 = loss.clone().into_scalar().elem();

            let predicted = argmax_classes(logits.detach())?;
            let targets = int_tensor_to_vec(batch.targets)?;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self
                .optimizer
                .step(self.learning_rate, self.model.clone(), grads);

            metrics.update(loss_val, count_correct(&predicted, &targets), batch_size);
        }

        Ok(metrics)
    }

    /// Validate one epoch without gradient tracking
    fn validate_epoch(
        &self,
        loader: impl Iterator<Item = EmbeddingBatch<B::InnerBackend>>,
    ) -> Result<Metrics> {
        let model = self.model.valid();
        let mut metrics = Metrics::new();

        for batch in loader {
            let batch_size = batch.embeddings.dims()[0];

            let logits = model.forward(batch.embeddings);
            let loss = categorical_cross_entropy(logits.clone(), batch.one_hot);
            let loss_val: f32 = loss.into_scalar().elem();

            let predicted = argmax_classes(logits)?;
            let targets = int_tensor_to_vec(batch.targets)?;

            metrics.update(loss_val, count_correct(&predicted, &targets), batch_size);
        }

        Ok(metrics)
    }
}
