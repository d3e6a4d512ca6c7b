//! Diagnostics for trained classifiers and embedding sets

pub mod plots;
pub mod tsne;

use std::path::{Path, PathBuf};

use crate::data::EmbeddingDataset;
use crate::Result;

pub use plots::{
    plot_confusion_matrix, plot_training_history, plot_tsne, plot_tsne_per_genre, split_per_genre,
    GenreScatter, TSNE_PLOT,
};
pub use tsne::Tsne;

/// Project train and test embeddings with t-SNE and plot them.
///
/// Writes `tsne_plot_train.svg` and `tsne_plot_test.svg`; with `per_genre`,
/// also one `tsne_plot_{genre}.svg` per genre from a joint projection.
pub fn tsne_report(
    tsne: &Tsne,
    train: &EmbeddingDataset,
    test: &EmbeddingDataset,
    dir: &Path,
    per_genre: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (title, dataset) in [("train", train), ("test", test)] {
        log::info!("Running t-SNE on {} {} embeddings", dataset.len(), title);
        let points = tsne.fit_transform(&dataset.embeddings())?;
        let file_name = format!("tsne_plot_{}.svg", title);
        written.push(plot_tsne(&points, &dataset.labels(), dir, title, &file_name)?);
    }

    if per_genre {
        let mut data = train.embeddings();
        data.extend(test.embeddings());
        let mut labels = train.labels();
        labels.extend(test.labels());
        let is_train: Vec<bool> = (0..data.len()).map(|i| i < train.len()).collect();

        log::info!("Running joint t-SNE on {} embeddings", data.len());
        let points = tsne.fit_transform(&data)?;
        written.extend(plot_tsne_per_genre(&points, &labels, &is_train, dir)?);
    }

    Ok(written)
}
