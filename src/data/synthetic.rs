//! Synthetic clustered embeddings for trying the pipeline end to end

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::embedding::save_embedding;
use crate::{Genre, Result};

/// Write `per_genre` embeddings for every genre into `dir`.
///
/// Each genre gets a random centre drawn from `centre_seed`; samples are the
/// centre plus uniform noise of width `spread` drawn from `sample_seed`.
/// Splits sharing a centre seed share their genre clusters. Files are named
/// `{genre}.{index:05}.npy`.
pub fn write_clustered_embeddings(
    dir: &Path,
    embedding_dim: usize,
    per_genre: usize,
    spread: f32,
    centre_seed: u64,
    sample_seed: u64,
) -> Result<usize> {
    std::fs::create_dir_all(dir)?;
    let mut centre_rng = StdRng::seed_from_u64(centre_seed);
    let mut rng = StdRng::seed_from_u64(sample_seed);

    let centres: Vec<Vec<f32>> = Genre::ALL
        .iter()
        .map(|_| {
            (0..embedding_dim)
                .map(|_| centre_rng.gen_range(-1.0..1.0))
                .collect()
        })
        .collect();

    let mut written = 0;
    for (genre, centre) in Genre::ALL.iter().zip(&centres) {
        for i in 0..per_genre {
            let embedding: Vec<f32> = centre
                .iter()
                .map(|c| c + rng.gen_range(-spread..=spread))
                .collect();
            save_embedding(&dir.join(format!("{}.{:05}.npy", genre, i)), &embedding)?;
            written += 1;
        }
    }

    log::debug!("Wrote {} synthetic embeddings to {}", written, dir.display());
    Ok(written)
}
