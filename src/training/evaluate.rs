//! Model evaluation on a labeled dataset

use burn::data::dataloader::DataLoaderBuilder;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use crate::data::{EmbeddingBatcher, EmbeddingDataset};
use crate::model::GenreClassifier;
use crate::training::confusion::ConfusionMatrix;
use crate::{Genre, GenreError, Result};

/// Batch size used when only running inference
const EVAL_BATCH_SIZE: usize = 256;

/// Predicted class index for every row of a logit or probability tensor
pub fn argmax_classes<B: Backend>(scores: Tensor<B, 2>) -> Result<Vec<usize>> {
    int_tensor_to_vec(scores.argmax(1).flatten::<1>(0, 1))
}

/// Copy an integer tensor back to the host as class indices
pub fn int_tensor_to_vec<B: Backend>(tensor: Tensor<B, 1, Int>) -> Result<Vec<usize>> {
    tensor
        .into_data()
        .convert::<i64>()
        .into_vec::<i64>()
        .map(|v| v.into_iter().map(|i| i as usize).collect())
        .map_err(|e| GenreError::Model(format!("Failed to read tensor data: {:?}", e)))
}

/// Number of rows where the predicted class equals the target
pub fn count_correct(predicted: &[usize], targets: &[usize]) -> usize {
    predicted
        .iter()
        .zip(targets)
        .filter(|(p, t)| p == t)
        .count()
}

/// Predict every sample of `dataset` and tabulate against the true labels
pub fn evaluate<B: Backend>(
    model: &GenreClassifier<B>,
    dataset: &EmbeddingDataset,
    device: &B::Device,
) -> Result<ConfusionMatrix> {
    let loader = DataLoaderBuilder::new(EmbeddingBatcher::<B>::new(device.clone()))
        .batch_size(EVAL_BATCH_SIZE)
        .build(dataset.clone());

    let mut cm = ConfusionMatrix::new();
    for batch in loader.iter() {
        let predicted = argmax_classes(model.forward(batch.embeddings))?;
        let targets = int_tensor_to_vec(batch.targets)?;

        for (t, p) in targets.into_iter().zip(predicted) {
            match (Genre::from_index(t), Genre::from_index(p)) {
                (Some(t), Some(p)) => cm.add(t, p),
                _ => {
                    return Err(GenreError::Model(format!(
                        "Class index out of range: target {}, prediction {}",
                        t, p
                    )))
                }
            }
        }
    }

    log::info!(
        "Evaluated {} samples: accuracy {:.2}%",
        cm.total(),
        cm.accuracy() * 100.0
    );
    Ok(cm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EmbeddingSample;
    use crate::model::ClassifierConfig;
    use burn::backend::NdArray;
    use std::path::PathBuf;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_argmax_classes() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 2>::from_floats(
            [[0.1, 0.7, 0.2], [0.9, 0.05, 0.05], [0.0, 0.0, 1.0]],
            &device,
        );
        assert_eq!(argmax_classes(scores).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_count_correct() {
        assert_eq!(count_correct(&[1, 2, 3, 4], &[1, 0, 3, 0]), 2);
        assert_eq!(count_correct(&[], &[]), 0);
    }

    #[test]
    fn test_evaluate_counts_every_sample() {
        let samples: Vec<_> = (0..7)
            .map(|i| EmbeddingSample {
                embedding: vec![i as f32, 1.0, -1.0, 0.5],
                genre: Genre::ALL[i % Genre::COUNT],
                path: PathBuf::from(format!("{}.npy", i)),
            })
            .collect();
        let dataset = EmbeddingDataset::from_samples(samples, 4).unwrap();

        let device = Default::default();
        let config = ClassifierConfig {
            embedding_dim: 4,
            ..Default::default()
        };
        let model = GenreClassifier::<TestBackend>::new(&device, &config);

        let cm = evaluate(&model, &dataset, &device).unwrap();
        assert_eq!(cm.total(), 7);
        let row_totals: Vec<usize> = cm.rows().iter().map(|r| r.iter().sum()).collect();
        assert_eq!(row_totals[Genre::Blues.index()], 1);
        assert_eq!(row_totals[Genre::HipHop.index()], 0);
    }
}
