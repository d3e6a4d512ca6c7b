//! Genre labels inferred from embedding file names

use std::path::Path;

use crate::{Genre, GenreError, Result};

/// All genres whose name occurs in `file_name`, in class-index order
pub fn matching_genres(file_name: &str) -> Vec<Genre> {
    let lower = file_name.to_lowercase();
    Genre::ALL
        .iter()
        .copied()
        .filter(|g| lower.contains(g.name()))
        .collect()
}

/// Infer the genre of an embedding file from its file name.
///
/// Only the final path component is inspected. When the name contains more
/// than one genre, the first in class-index order wins.
pub fn infer_genre(path: &Path) -> Result<Genre> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GenreError::UnknownGenre(path.to_path_buf()))?;

    let matches = matching_genres(file_name);
    match matches.as_slice() {
        [] => Err(GenreError::UnknownGenre(path.to_path_buf())),
        [genre] => Ok(*genre),
        [first, ..] => {
            log::warn!(
                "{} matches several genres {:?}, using {}",
                file_name,
                matches.iter().map(|g| g.name()).collect::<Vec<_>>(),
                first
            );
            Ok(*first)
        }
    }
}

/// One-hot encoding of a genre
pub fn one_hot(genre: Genre) -> [f32; Genre::COUNT] {
    let mut v = [0.0; Genre::COUNT];
    v[genre.index()] = 1.0;
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_infer_from_gtzan_names() {
        assert_eq!(infer_genre(Path::new("blues.00012.npy")).unwrap(), Genre::Blues);
        assert_eq!(infer_genre(Path::new("hiphop.00099_3.npy")).unwrap(), Genre::HipHop);
        assert_eq!(infer_genre(Path::new("em_Classical_7.npy")).unwrap(), Genre::Classical);
    }

    #[test]
    fn test_parent_directory_ignored() {
        let path = PathBuf::from("/data/rock_runs/jazz.00001.npy");
        assert_eq!(infer_genre(&path).unwrap(), Genre::Jazz);
    }

    #[test]
    fn test_unknown_genre() {
        let err = infer_genre(Path::new("polka.00001.npy")).unwrap_err();
        assert!(matches!(err, GenreError::UnknownGenre(_)));
    }

    #[test]
    fn test_ambiguous_name_uses_class_order() {
        // "metal" precedes "rock" in class order
        assert_eq!(matching_genres("rock_metal_01.npy"), vec![Genre::Metal, Genre::Rock]);
        assert_eq!(infer_genre(Path::new("rock_metal_01.npy")).unwrap(), Genre::Metal);
    }

    #[test]
    fn test_one_hot() {
        let v = one_hot(Genre::Disco);
        assert_eq!(v.iter().sum::<f32>(), 1.0);
        assert_eq!(v[Genre::Disco.index()], 1.0);
    }
}
