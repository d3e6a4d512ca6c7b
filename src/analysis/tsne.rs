//! Exact t-SNE projection to two dimensions
//!
//! O(n²) per iteration, which is fine for the few thousand embeddings a
//! genre dataset holds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{GenreError, Result, TsneConfig};

/// Iterations during which P is exaggerated and momentum is low
const EXAGGERATION_ITERS: usize = 250;
const EARLY_EXAGGERATION: f64 = 12.0;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MIN_GAIN: f64 = 0.01;
const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const PERPLEXITY_SEARCH_STEPS: usize = 50;
const MACHINE_EPSILON: f64 = 1e-12;

/// t-SNE parameters
#[derive(Debug, Clone)]
pub struct Tsne {
    pub perplexity: f64,
    pub iterations: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for Tsne {
    fn default() -> Self {
        Tsne {
            perplexity: 30.0,
            iterations: 1000,
            learning_rate: 200.0,
            seed: 42,
        }
    }
}

impl From<&TsneConfig> for Tsne {
    fn from(config: &TsneConfig) -> Self {
        Tsne {
            perplexity: config.perplexity,
            iterations: config.iterations,
            learning_rate: config.learning_rate,
            seed: config.seed,
        }
    }
}

impl Tsne {
    /// Embed `data` (one row per point) into the plane
    pub fn fit_transform(&self, data: &[Vec<f32>]) -> Result<Vec<[f64; 2]>> {
        let n = data.len();
        if n < 2 {
            return Err(GenreError::Tsne(format!("need at least 2 points, got {}", n)));
        }
        let dim = data[0].len();
        if data.iter().any(|row| row.len() != dim) {
            return Err(GenreError::Tsne("rows have different lengths".to_string()));
        }

        let perplexity = effective_perplexity(self.perplexity, n);
        if perplexity < self.perplexity {
            log::debug!(
                "Perplexity reduced from {} to {:.2} for {} points",
                self.perplexity,
                perplexity,
                n
            );
        }

        let p = joint_probabilities(&squared_distances(data), n, perplexity);
        let y = self.optimize(&p, n);

        Ok(y)
    }

    fn optimize(&self, p: &[f64], n: usize) -> Vec<[f64; 2]> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut y: Vec<[f64; 2]> = (0..n)
            .map(|_| [gaussian(&mut rng) * 1e-4, gaussian(&mut rng) * 1e-4])
            .collect();
        let mut update = vec![[0.0f64; 2]; n];
        let mut gains = vec![[1.0f64; 2]; n];
        let mut num = vec![0.0f64; n * n];
        let mut grad = vec![[0.0f64; 2]; n];

        for iter in 0..self.iterations {
            let (exaggeration, momentum) = if iter < EXAGGERATION_ITERS {
                (EARLY_EXAGGERATION, INITIAL_MOMENTUM)
            } else {
                (1.0, FINAL_MOMENTUM)
            };

            // Student-t kernel
            let mut num_sum = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = y[i][0] - y[j][0];
                    let dy = y[i][1] - y[j][1];
                    let v = 1.0 / (1.0 + dx * dx + dy * dy);
                    num[i * n + j] = v;
                    num[j * n + i] = v;
                    num_sum += 2.0 * v;
                }
            }

            for i in 0..n {
                let mut g = [0.0f64; 2];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let q = (num[i * n + j] / num_sum).max(MACHINE_EPSILON);
                    let mult = (exaggeration * p[i * n + j] - q) * num[i * n + j];
                    g[0] += mult * (y[i][0] - y[j][0]);
                    g[1] += mult * (y[i][1] - y[j][1]);
                }
                grad[i] = [4.0 * g[0], 4.0 * g[1]];
            }

            for i in 0..n {
                for d in 0..2 {
                    gains[i][d] = if grad[i][d] * update[i][d] < 0.0 {
                        gains[i][d] + 0.2
                    } else {
                        gains[i][d] * 0.8
                    }
                    .max(MIN_GAIN);
                    update[i][d] =
                        momentum * update[i][d] - self.learning_rate * gains[i][d] * grad[i][d];
                    y[i][d] += update[i][d];
                }
            }

            center(&mut y);

            if log::log_enabled!(log::Level::Debug) && (iter + 1) % 100 == 0 {
                let kl = kl_divergence(p, &num, num_sum, n);
                log::debug!("t-SNE iteration {}: KL divergence {:.4}", iter + 1, kl);
            }
        }

        y
    }
}

/// Perplexity reduced to at most `(n - 1) / 3`, never below one neighbour
fn effective_perplexity(requested: f64, n: usize) -> f64 {
    requested.min((n as f64 - 1.0) / 3.0).max(1.0)
}

/// Pairwise squared Euclidean distances, row-major n×n
fn squared_distances(data: &[Vec<f32>]) -> Vec<f64> {
    let n = data.len();
    let mut d = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dist: f64 = data[i]
                .iter()
                .zip(&data[j])
                .map(|(a, b)| {
                    let diff = (*a - *b) as f64;
                    diff * diff
                })
                .sum();
            d[i * n + j] = dist;
            d[j * n + i] = dist;
        }
    }
    d
}

/// Symmetrised affinities P = (P_j|i + P_i|j) / 2n, built in place
fn joint_probabilities(distances: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    let mut p = vec![0.0f64; n * n];
    for i in 0..n {
        let row = conditional_row(&distances[i * n..(i + 1) * n], i, perplexity);
        p[i * n..(i + 1) * n].copy_from_slice(&row);
    }

    let denom = 2.0 * n as f64;
    for i in 0..n {
        for j in (i + 1)..n {
            let v = ((p[i * n + j] + p[j * n + i]) / denom).max(MACHINE_EPSILON);
            p[i * n + j] = v;
            p[j * n + i] = v;
        }
    }
    p
}

/// Binary search for the Gaussian precision giving the target perplexity
fn conditional_row(distances: &[f64], i: usize, perplexity: f64) -> Vec<f64> {
    let target_entropy = perplexity.ln();
    let mut beta = 1.0f64;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let mut row = vec![0.0f64; distances.len()];

    for _ in 0..PERPLEXITY_SEARCH_STEPS {
        let mut sum = 0.0;
        let mut weighted = 0.0;
        for (j, &d) in distances.iter().enumerate() {
            if j == i {
                row[j] = 0.0;
                continue;
            }
            let v = (-d * beta).exp();
            row[j] = v;
            sum += v;
            weighted += d * v;
        }
        let sum = sum.max(MACHINE_EPSILON);
        let entropy = sum.ln() + beta * weighted / sum;
        for v in row.iter_mut() {
            *v /= sum;
        }

        let diff = entropy - target_entropy;
        if diff.abs() < PERPLEXITY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() { beta * 2.0 } else { (beta + beta_max) / 2.0 };
        } else {
            beta_max = beta;
            beta = if beta_min.is_infinite() { beta / 2.0 } else { (beta + beta_min) / 2.0 };
        }
    }

    row
}

fn kl_divergence(p: &[f64], num: &[f64], num_sum: f64, n: usize) -> f64 {
    let mut kl = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let q = (num[i * n + j] / num_sum).max(MACHINE_EPSILON);
                kl += p[i * n + j] * (p[i * n + j] / q).ln();
            }
        }
    }
    kl
}

fn center(y: &mut [[f64; 2]]) {
    let n = y.len() as f64;
    let mean_x = y.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = y.iter().map(|p| p[1]).sum::<f64>() / n;
    for p in y.iter_mut() {
        p[0] -= mean_x;
        p[1] -= mean_y;
    }
}

/// Standard normal sample (Box-Muller)
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters(per_cluster: usize) -> Vec<Vec<f32>> {
        let mut data = Vec::new();
        for c in 0..2 {
            let offset = if c == 0 { 0.0 } else { 50.0 };
            for i in 0..per_cluster {
                let jitter = i as f32 * 0.05;
                data.push(vec![offset + jitter, offset - jitter, offset, jitter]);
            }
        }
        data
    }

    fn mean(points: &[[f64; 2]]) -> [f64; 2] {
        let n = points.len() as f64;
        [
            points.iter().map(|p| p[0]).sum::<f64>() / n,
            points.iter().map(|p| p[1]).sum::<f64>() / n,
        ]
    }

    fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }

    #[test]
    fn test_clusters_stay_separated() {
        let data = two_clusters(15);
        let tsne = Tsne {
            perplexity: 5.0,
            iterations: 400,
            ..Default::default()
        };
        let y = tsne.fit_transform(&data).unwrap();
        assert_eq!(y.len(), 30);

        let a = mean(&y[..15]);
        let b = mean(&y[15..]);
        let between = dist(a, b);
        let spread_a = y[..15].iter().map(|p| dist(*p, a)).fold(0.0, f64::max);
        let spread_b = y[15..].iter().map(|p| dist(*p, b)).fold(0.0, f64::max);
        assert!(
            between > spread_a.max(spread_b),
            "between {} spread {} {}",
            between,
            spread_a,
            spread_b
        );
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = two_clusters(5);
        let tsne = Tsne {
            iterations: 50,
            ..Default::default()
        };
        assert_eq!(tsne.fit_transform(&data).unwrap(), tsne.fit_transform(&data).unwrap());
    }

    #[test]
    fn test_output_is_centered() {
        let data = two_clusters(6);
        let tsne = Tsne {
            iterations: 30,
            ..Default::default()
        };
        let y = tsne.fit_transform(&data).unwrap();
        let m = mean(&y);
        assert!(m[0].abs() < 1e-9 && m[1].abs() < 1e-9);
    }

    #[test]
    fn test_conditional_row_is_distribution() {
        let distances = [0.0, 1.0, 4.0, 9.0, 16.0];
        let row = conditional_row(&distances, 0, 2.0);
        assert_eq!(row[0], 0.0);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(row[1] > row[2] && row[2] > row[3]);
    }

    #[test]
    fn test_effective_perplexity() {
        assert_eq!(effective_perplexity(30.0, 1000), 30.0);
        assert_eq!(effective_perplexity(30.0, 31), 10.0);
        assert_eq!(effective_perplexity(5.0, 16), 5.0);
        // Tiny sets keep one effective neighbour
        assert_eq!(effective_perplexity(30.0, 2), 1.0);
        assert_eq!(effective_perplexity(30.0, 3), 1.0);
    }

    #[test]
    fn test_joint_probabilities_symmetric() {
        let data = two_clusters(4);
        let n = data.len();
        let p = joint_probabilities(&squared_distances(&data), n, 2.0);

        for i in 0..n {
            assert_eq!(p[i * n + i], 0.0);
            for j in 0..n {
                assert_eq!(p[i * n + j], p[j * n + i]);
            }
        }
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_points() {
        let err = Tsne::default().fit_transform(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, GenreError::Tsne(_)));
    }
}
