//! Reading and writing `.npy` embedding files

use std::path::Path;

use ndarray::{Array1, ArrayD};
use ndarray_npy::{read_npy, write_npy, ReadNpyError};

use crate::{GenreError, Result};

/// Load one embedding and flatten it to a vector of length `dim`.
///
/// Accepts `f32` or `f64` arrays of any shape as long as the element count
/// is `dim`, so `(dim,)`, `(1, dim)` and `(1, 1, dim)` files all load.
pub fn load_embedding(path: &Path, dim: usize) -> Result<Vec<f32>> {
    let values: Vec<f32> = match read_npy::<_, ArrayD<f32>>(path) {
        Ok(array) => array.iter().copied().collect(),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let array: ArrayD<f64> = read_npy(path)?;
            array.iter().map(|&v| v as f32).collect()
        }
        Err(e) => return Err(e.into()),
    };

    if values.len() != dim {
        return Err(GenreError::EmbeddingShape {
            path: path.to_path_buf(),
            expected: dim,
            found: values.len(),
        });
    }

    Ok(values)
}

/// Write an embedding as a 1-D `f32` array
pub fn save_embedding(path: &Path, embedding: &[f32]) -> Result<()> {
    let array = Array1::from(embedding.to_vec());
    write_npy(path, &array)?;
    Ok(())
}
