//! Confusion matrix over genre predictions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Genre;

/// Counts of (true label, predicted label) pairs
///
/// Rows are true labels, columns are predictions, both in class-index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        ConfusionMatrix {
            counts: vec![vec![0; Genre::COUNT]; Genre::COUNT],
        }
    }

    /// Build from parallel slices of true and predicted labels
    pub fn from_predictions(truth: &[Genre], predicted: &[Genre]) -> Self {
        let mut cm = Self::new();
        for (t, p) in truth.iter().zip(predicted) {
            cm.add(*t, *p);
        }
        cm
    }

    pub fn add(&mut self, truth: Genre, predicted: Genre) {
        self.counts[truth.index()][predicted.index()] += 1;
    }

    pub fn get(&self, truth: Genre, predicted: Genre) -> usize {
        self.counts[truth.index()][predicted.index()]
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Largest single cell count
    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let diagonal: usize = (0..Genre::COUNT).map(|i| self.counts[i][i]).sum();
        diagonal as f64 / total as f64
    }

    /// Recall per genre; `None` where the genre has no true samples
    pub fn per_class_recall(&self) -> Vec<Option<f64>> {
        (0..Genre::COUNT)
            .map(|i| {
                let row: usize = self.counts[i].iter().sum();
                (row > 0).then(|| self.counts[i][i] as f64 / row as f64)
            })
            .collect()
    }

    /// Precision per genre; `None` where the genre was never predicted
    pub fn per_class_precision(&self) -> Vec<Option<f64>> {
        (0..Genre::COUNT)
            .map(|j| {
                let col: usize = self.counts.iter().map(|row| row[j]).sum();
                (col > 0).then(|| self.counts[j][j] as f64 / col as f64)
            })
            .collect()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "")?;
        for genre in Genre::ALL {
            write!(f, "{:>10}", genre.name())?;
        }
        writeln!(f, "{:>9}", "recall")?;

        let recall = self.per_class_recall();
        for (genre, row) in Genre::ALL.iter().zip(&self.counts) {
            write!(f, "{:>10}", genre.name())?;
            for count in row {
                write!(f, "{:>10}", count)?;
            }
            match recall[genre.index()] {
                Some(r) => writeln!(f, "{:>8.1}%", r * 100.0)?,
                None => writeln!(f, "{:>9}", "-")?,
            }
        }

        write!(
            f,
            "Accuracy: {:.2}% ({} samples)",
            self.accuracy() * 100.0,
            self.total()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_accuracy() {
        let truth = [Genre::Blues, Genre::Blues, Genre::Jazz, Genre::Rock];
        let pred = [Genre::Blues, Genre::Jazz, Genre::Jazz, Genre::Rock];
        let cm = ConfusionMatrix::from_predictions(&truth, &pred);

        assert_eq!(cm.total(), 4);
        assert_eq!(cm.get(Genre::Blues, Genre::Blues), 1);
        assert_eq!(cm.get(Genre::Blues, Genre::Jazz), 1);
        assert_eq!(cm.get(Genre::Jazz, Genre::Blues), 0);
        assert_eq!(cm.max_count(), 1);
        assert!((cm.accuracy() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_recall_and_precision() {
        let truth = [Genre::Blues, Genre::Blues, Genre::Jazz];
        let pred = [Genre::Blues, Genre::Jazz, Genre::Jazz];
        let cm = ConfusionMatrix::from_predictions(&truth, &pred);

        let recall = cm.per_class_recall();
        assert_eq!(recall[Genre::Blues.index()], Some(0.5));
        assert_eq!(recall[Genre::Jazz.index()], Some(1.0));
        assert_eq!(recall[Genre::Pop.index()], None);

        let precision = cm.per_class_precision();
        assert_eq!(precision[Genre::Blues.index()], Some(1.0));
        assert_eq!(precision[Genre::Jazz.index()], Some(0.5));
        assert_eq!(precision[Genre::Metal.index()], None);
    }

    #[test]
    fn test_display_contains_labels() {
        let cm = ConfusionMatrix::from_predictions(&[Genre::Disco], &[Genre::Disco]);
        let table = cm.to_string();
        assert!(table.contains("disco"));
        assert!(table.contains("hiphop"));
        assert!(table.contains("Accuracy: 100.00%"));
    }

    #[test]
    fn test_empty() {
        let cm = ConfusionMatrix::new();
        assert_eq!(cm.total(), 0);
        assert_eq!(cm.accuracy(), 0.0);
    }
}
