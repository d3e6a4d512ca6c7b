//! Diagnostic plots: training curves, confusion matrix and t-SNE scatters

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::coord::ranged1d::{IntoSegmentedCoord, SegmentValue, SegmentedCoord};
use plotters::coord::types::RangedCoordi32;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::training::{ConfusionMatrix, TrainingHistory};
use crate::{Genre, GenreError, Result};

pub const LOSS_PLOT: &str = "loss.png";
pub const CONFUSION_PLOT: &str = "confusion.png";
pub const TSNE_PLOT: &str = "tsne_plot.svg";

/// Scatter colour per genre, in class-index order
pub const GENRE_PALETTE: [RGBColor; Genre::COUNT] = [
    RGBColor(128, 0, 128),   // purple
    RGBColor(144, 238, 144), // lightgreen
    RGBColor(255, 0, 0),     // red
    RGBColor(255, 165, 0),   // orange
    RGBColor(165, 42, 42),   // brown
    RGBColor(0, 0, 255),     // blue
    RGBColor(30, 144, 255),  // dodgerblue
    RGBColor(0, 128, 0),     // green
    RGBColor(0, 139, 139),   // darkcyan
    RGBColor(0, 0, 0),       // black
];

const TRAIN_COLOR: RGBColor = RGBColor(255, 0, 0);
const TEST_COLOR: RGBColor = RGBColor(0, 0, 0);

type DrawResult = std::result::Result<(), Box<dyn Error>>;

fn plot_error(path: &Path, e: Box<dyn Error>) -> GenreError {
    GenreError::Plot(format!("{}: {}", path.display(), e))
}

fn log_output_path(path: &Path) {
    log::info!("Wrote {}", path.display());
}

/// Loss/accuracy curves for train and validation → `loss.png`
pub fn plot_training_history(history: &TrainingHistory, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOSS_PLOT);
    draw_training_history(history, &path).map_err(|e| plot_error(&path, e))?;
    log_output_path(&path);
    Ok(path)
}

fn draw_training_history(history: &TrainingHistory, path: &Path) -> DrawResult {
    let epochs = history.epochs().max(1);
    let y_max = history
        .train_losses
        .iter()
        .chain(&history.val_losses)
        .chain(&history.train_accuracies)
        .chain(&history.val_accuracies)
        .copied()
        .filter(|v| v.is_finite())
        .fold(1.0f64, f64::max);

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Training Loss and Accuracy", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..epochs as f64, 0f64..y_max * 1.05)?;

    chart
        .configure_mesh()
        .bold_line_style(RGBColor(229, 229, 229))
        .x_desc("Epoch #")
        .y_desc("Loss/Accuracy")
        .draw()?;

    let curves: [(&str, &[f64], RGBColor); 4] = [
        ("train_loss", &history.train_losses, RGBColor(226, 74, 51)),
        ("val_loss", &history.val_losses, RGBColor(52, 138, 189)),
        ("train_acc", &history.train_accuracies, RGBColor(152, 142, 213)),
        ("val_acc", &history.val_accuracies, RGBColor(119, 119, 119)),
    ];
    for (label, values, color) in curves {
        let points = values.iter().enumerate().map(|(i, v)| (i as f64, *v));
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Cell fill for a count, white for zero through dark blue for `max`
pub fn heat_color(count: usize, max: usize) -> RGBColor {
    let t = if max == 0 { 0.0 } else { count as f64 / max as f64 };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(lerp(247, 8), lerp(251, 48), lerp(255, 107))
}

/// Annotated heatmap of the confusion matrix → `confusion.png`
pub fn plot_confusion_matrix(cm: &ConfusionMatrix, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(CONFUSION_PLOT);
    draw_confusion_matrix(cm, &path).map_err(|e| plot_error(&path, e))?;
    log_output_path(&path);
    Ok(path)
}

/// One segment per genre on a heatmap axis
fn genre_axis() -> SegmentedCoord<RangedCoordi32> {
    // Integer ranges are inclusive of their upper bound once segmented
    (0..Genre::COUNT as i32 - 1).into_segmented()
}

/// Tick label for a segment index; indices outside the class range show as numbers
fn genre_tick(index: i32) -> String {
    usize::try_from(index)
        .ok()
        .and_then(Genre::from_index)
        .map(|g| g.name().to_string())
        .unwrap_or_else(|| index.to_string())
}

/// Right or top edge of cell `index`
fn cell_edge(index: i32) -> SegmentValue<i32> {
    if index >= Genre::COUNT as i32 {
        SegmentValue::Last
    } else {
        SegmentValue::Exact(index)
    }
}

fn draw_confusion_matrix(cm: &ConfusionMatrix, path: &Path) -> DrawResult {
    let n = Genre::COUNT as i32;
    let max = cm.max_count();
    // First genre is drawn at the top
    let row_to_y = |row: usize| n - 1 - row as i32;

    let root = BitMapBackend::new(path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(genre_axis(), genre_axis())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Prediction")
        .y_desc("Label")
        .x_labels(Genre::COUNT)
        .y_labels(Genre::COUNT)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(x) => genre_tick(*x),
            _ => String::new(),
        })
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(y) => genre_tick(n - 1 - *y),
            _ => String::new(),
        })
        .draw()?;

    let centered = Pos::new(HPos::Center, VPos::Center);
    for (row, counts) in cm.rows().iter().enumerate() {
        let y = row_to_y(row);
        for (col, &count) in counts.iter().enumerate() {
            let x = col as i32;
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                    (cell_edge(x + 1), cell_edge(y + 1)),
                ],
                heat_color(count, max).filled(),
            )))?;

            let text_color: &RGBColor = if max > 0 && count * 2 > max { &WHITE } else { &BLACK };
            let style = TextStyle::from(("sans-serif", 16).into_font())
                .color(text_color)
                .pos(centered);
            chart.draw_series(std::iter::once(Text::new(
                count.to_string(),
                (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
                style,
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Axis limits: `((xmin, xmax), (ymin, ymax))`
pub type Extent = ((f64, f64), (f64, f64));

/// Axis bounds covering every point plus a margin of a tenth of the y range
pub fn padded_extent(points: &[[f64; 2]]) -> Extent {
    let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        xmin = xmin.min(p[0]);
        xmax = xmax.max(p[0]);
        ymin = ymin.min(p[1]);
        ymax = ymax.max(p[1]);
    }
    if !xmin.is_finite() {
        return ((-1.0, 1.0), (-1.0, 1.0));
    }
    let eps = ((ymax - ymin) / 10.0).max(1e-6);
    ((xmin - eps, xmax + eps), (ymin - eps, ymax + eps))
}

/// Scatter of 2-D t-SNE points coloured by genre
pub fn plot_tsne(
    points: &[[f64; 2]],
    labels: &[Genre],
    dir: &Path,
    title: &str,
    file_name: &str,
) -> Result<PathBuf> {
    if points.len() != labels.len() {
        return Err(GenreError::Plot(format!(
            "{} points but {} labels",
            points.len(),
            labels.len()
        )));
    }
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);

    let caption = format!("TSNE plot of the {} Embeddings", title);
    let groups: Vec<(String, RGBColor, Vec<(f64, f64)>)> = Genre::ALL
        .iter()
        .map(|genre| {
            let selected = points
                .iter()
                .zip(labels)
                .filter(|(_, l)| *l == genre)
                .map(|(p, _)| (p[0], p[1]))
                .collect();
            (genre.name().to_string(), GENRE_PALETTE[genre.index()], selected)
        })
        .collect();

    draw_scatter(&path, &caption, padded_extent(points), &groups)
        .map_err(|e| plot_error(&path, e))?;
    log_output_path(&path);
    Ok(path)
}

/// Train and test points of one genre from a joint projection
#[derive(Debug, Clone, PartialEq)]
pub struct GenreScatter {
    pub genre: Genre,
    pub train: Vec<(f64, f64)>,
    pub test: Vec<(f64, f64)>,
}

/// Split a joint projection into one scatter per genre, in class order.
///
/// Also returns the axis limits of all points, shared by every plot.
pub fn split_per_genre(
    points: &[[f64; 2]],
    labels: &[Genre],
    is_train: &[bool],
) -> Result<(Extent, Vec<GenreScatter>)> {
    if points.len() != labels.len() || points.len() != is_train.len() {
        return Err(GenreError::Plot(
            "points, labels and split markers differ in length".to_string(),
        ));
    }

    let mut scatters: Vec<GenreScatter> = Genre::ALL
        .iter()
        .map(|&genre| GenreScatter {
            genre,
            train: Vec::new(),
            test: Vec::new(),
        })
        .collect();
    for ((p, genre), &train) in points.iter().zip(labels).zip(is_train) {
        let scatter = &mut scatters[genre.index()];
        if train {
            scatter.train.push((p[0], p[1]));
        } else {
            scatter.test.push((p[0], p[1]));
        }
    }

    Ok((padded_extent(points), scatters))
}

/// One scatter per genre from a joint t-SNE of train and test points.
///
/// `points` holds train points first, then test points; `is_train` marks
/// which is which. Every plot shares the same axis limits.
pub fn plot_tsne_per_genre(
    points: &[[f64; 2]],
    labels: &[Genre],
    is_train: &[bool],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let (extent, scatters) = split_per_genre(points, labels, is_train)?;
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(Genre::COUNT);
    for GenreScatter { genre, train, test } in scatters {
        let groups = vec![
            ("train".to_string(), TRAIN_COLOR, train),
            ("test".to_string(), TEST_COLOR, test),
        ];

        let path = dir.join(format!("tsne_plot_{}.svg", genre));
        let caption = format!("TSNE plot of the {} Embeddings", genre);
        draw_scatter(&path, &caption, extent, &groups).map_err(|e| plot_error(&path, e))?;
        log_output_path(&path);
        written.push(path);
    }

    Ok(written)
}

fn draw_scatter(
    path: &Path,
    caption: &str,
    ((xmin, xmax), (ymin, ymax)): Extent,
    groups: &[(String, RGBColor, Vec<(f64, f64)>)],
) -> DrawResult {
    let root = SVGBackend::new(path, (1000, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 25))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(xmin..xmax, ymin..ymax)?;

    chart.configure_mesh().draw()?;

    for (label, color, pts) in groups {
        let color = *color;
        chart
            .draw_series(pts.iter().map(|p| Circle::new(*p, 4, color.filled())))?
            .label(label.as_str())
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Metrics;
    use plotters::coord::ranged1d::DiscreteRanged;

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(0, 10), RGBColor(247, 251, 255));
        assert_eq!(heat_color(10, 10), RGBColor(8, 48, 107));
        assert_eq!(heat_color(3, 0), RGBColor(247, 251, 255));
    }

    #[test]
    fn test_padded_extent() {
        let ((xmin, xmax), (ymin, ymax)) = padded_extent(&[[0.0, 0.0], [4.0, 10.0]]);
        assert_eq!((xmin, xmax), (-1.0, 5.0));
        assert_eq!((ymin, ymax), (-1.0, 11.0));
        assert_eq!(padded_extent(&[]), ((-1.0, 1.0), (-1.0, 1.0)));
    }

    #[test]
    fn test_genre_axis_has_one_segment_per_genre() {
        let axis = genre_axis();
        // Value segments plus the closing `Last` edge
        assert_eq!(axis.size(), Genre::COUNT + 1);
        assert!(matches!(
            axis.from_index(Genre::COUNT - 1),
            Some(SegmentValue::Exact(v)) if v == Genre::COUNT as i32 - 1
        ));
        assert!(matches!(axis.from_index(Genre::COUNT), Some(SegmentValue::Last)));
    }

    #[test]
    fn test_genre_tick_labels() {
        assert_eq!(genre_tick(0), "blues");
        assert_eq!(genre_tick(Genre::COUNT as i32 - 1), "hiphop");
        assert_eq!(genre_tick(Genre::COUNT as i32), "10");
        assert_eq!(genre_tick(-1), "-1");
        assert!(matches!(cell_edge(3), SegmentValue::Exact(3)));
        assert!(matches!(cell_edge(Genre::COUNT as i32), SegmentValue::Last));
    }

    #[test]
    fn test_split_per_genre() {
        let points = [[0.0, 1.0], [1.0, 0.0], [2.0, 2.0], [3.0, -1.0], [5.0, 4.0]];
        let labels = [Genre::Blues, Genre::Metal, Genre::Blues, Genre::Blues, Genre::Jazz];
        let is_train = [true, true, false, true, false];

        let (extent, scatters) = split_per_genre(&points, &labels, &is_train).unwrap();
        assert_eq!(extent, padded_extent(&points));
        assert_eq!(scatters.len(), Genre::COUNT);
        for (scatter, genre) in scatters.iter().zip(Genre::ALL) {
            assert_eq!(scatter.genre, genre);
        }

        let blues = &scatters[Genre::Blues.index()];
        assert_eq!(blues.train, vec![(0.0, 1.0), (3.0, -1.0)]);
        assert_eq!(blues.test, vec![(2.0, 2.0)]);

        let metal = &scatters[Genre::Metal.index()];
        assert_eq!(metal.train, vec![(1.0, 0.0)]);
        assert!(metal.test.is_empty());

        let jazz = &scatters[Genre::Jazz.index()];
        assert!(jazz.train.is_empty());
        assert_eq!(jazz.test, vec![(5.0, 4.0)]);

        let pop = &scatters[Genre::Pop.index()];
        assert!(pop.train.is_empty() && pop.test.is_empty());
    }

    #[test]
    fn test_split_per_genre_rejects_mismatched_markers() {
        let err = split_per_genre(&[[0.0, 0.0]], &[Genre::Rock], &[]).unwrap_err();
        assert!(matches!(err, GenreError::Plot(_)));
    }

    #[test]
    fn test_palette_is_distinct() {
        for (i, a) in GENRE_PALETTE.iter().enumerate() {
            for b in &GENRE_PALETTE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = plot_tsne(&[[0.0, 0.0]], &[], dir.path(), "train", TSNE_PLOT).unwrap_err();
        assert!(matches!(err, GenreError::Plot(_)));
    }

    // Text rendering needs a system font
    #[test]
    #[ignore = "requires system fonts"]
    fn test_plots_written() {
        let dir = tempfile::tempdir().unwrap();

        let mut history = TrainingHistory::new();
        let mut m = Metrics::new();
        m.update(1.2, 1, 2);
        history.record_epoch(0, &m, &m);
        history.record_epoch(1, &m, &m);
        assert!(plot_training_history(&history, dir.path()).unwrap().exists());

        let cm = ConfusionMatrix::from_predictions(&[Genre::Jazz, Genre::Pop], &[Genre::Jazz, Genre::Rock]);
        assert!(plot_confusion_matrix(&cm, dir.path()).unwrap().exists());

        let points = [[0.0, 1.0], [1.0, 0.0], [2.0, 2.0]];
        let labels = [Genre::Blues, Genre::Blues, Genre::Metal];
        assert!(plot_tsne(&points, &labels, dir.path(), "test", TSNE_PLOT).unwrap().exists());

        let written =
            plot_tsne_per_genre(&points, &labels, &[true, false, true], dir.path()).unwrap();
        assert_eq!(written.len(), Genre::COUNT);
        assert!(written.iter().all(|p| p.exists()));
    }
}
