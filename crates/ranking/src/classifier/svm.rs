//! Linear support vector classifier
//!
//! L2-regularized squared-hinge loss solved by dual coordinate descent
//! with shrinking, over sparse rows. The intercept is learned as the
//! weight of an implicit constant feature equal to 1, so it is regularized
//! like every other weight.
//!
//! Class weights are balanced: each class contributes `n / (2 * n_class)`
//! times `C` as its per-sample penalty.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sanity_common::{AppError, Result};
use sprs::{CsMat, CsVecView};

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmParams {
    /// Regularization strength; larger values fit the training set harder
    pub c: f64,
    /// Maximum number of passes over the active set
    pub max_iter: usize,
    /// Stopping tolerance on the projected-gradient spread
    pub tolerance: f64,
    /// Seed of the coordinate visiting order
    pub seed: u64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 0.01,
            max_iter: 10_000,
            tolerance: 1e-6,
            seed: 0,
        }
    }
}

/// A trained linear decision function `w . x + b`
#[derive(Debug, Clone)]
pub struct LinearSvm {
    weights: Vec<f64>,
    bias: f64,
    iterations: usize,
    converged: bool,
}

impl LinearSvm {
    /// Fit against boolean labels aligned with the rows of `x`.
    ///
    /// Both classes must be present. Reaching `max_iter` is not an error;
    /// the returned model reports `converged() == false` instead.
    pub fn fit(x: &CsMat<f64>, labels: &[bool], params: &SvmParams) -> Result<Self> {
        let n = x.rows();
        if labels.len() != n {
            return Err(AppError::InvalidInput {
                message: format!("{} labels for {} rows", labels.len(), n),
            });
        }
        if !(params.c.is_finite() && params.c > 0.0) {
            return Err(AppError::InvalidInput {
                message: format!("regularization strength must be positive, got {}", params.c),
            });
        }

        let n_pos = labels.iter().filter(|&&l| l).count();
        let n_neg = n - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(AppError::InvalidInput {
                message: "training data must contain both classes".to_string(),
            });
        }

        let rows: Vec<CsVecView<'_, f64>> = x.outer_iterator().collect();
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();

        let pos_penalty = params.c * n as f64 / (2.0 * n_pos as f64);
        let neg_penalty = params.c * n as f64 / (2.0 * n_neg as f64);

        // squared hinge: the box constraint disappears and the penalty
        // moves onto the diagonal of the dual Hessian
        let diag: Vec<f64> = labels
            .iter()
            .map(|&l| 0.5 / if l { pos_penalty } else { neg_penalty })
            .collect();
        let qd: Vec<f64> = rows
            .iter()
            .zip(&diag)
            .map(|(row, d)| d + row.iter().map(|(_, v)| v * v).sum::<f64>() + 1.0)
            .collect();

        let mut weights = vec![0.0; x.cols()];
        let mut bias = 0.0;
        let mut alpha = vec![0.0; n];
        let mut index: Vec<usize> = (0..n).collect();
        let mut active = n;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut pg_max_old = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < params.max_iter {
            let mut pg_max_new = f64::NEG_INFINITY;
            let mut pg_min_new = f64::INFINITY;

            index[..active].shuffle(&mut rng);

            let mut s = 0;
            while s < active {
                let i = index[s];
                let row = &rows[i];
                let margin = dot(&weights, row) + bias;
                let g = y[i] * margin - 1.0 + alpha[i] * diag[i];

                let pg = if alpha[i] == 0.0 {
                    if g > pg_max_old {
                        // shrink: bound at zero and unlikely to move
                        active -= 1;
                        index.swap(s, active);
                        continue;
                    }
                    g.min(0.0)
                } else {
                    g
                };

                pg_max_new = pg_max_new.max(pg);
                pg_min_new = pg_min_new.min(pg);

                if pg.abs() > 1e-12 {
                    let old = alpha[i];
                    alpha[i] = (old - g / qd[i]).max(0.0);
                    let step = (alpha[i] - old) * y[i];
                    for (col, v) in row.iter() {
                        weights[col] += step * v;
                    }
                    bias += step;
                }
                s += 1;
            }

            iterations += 1;

            if pg_max_new - pg_min_new <= params.tolerance {
                if active == n {
                    converged = true;
                    break;
                }
                // re-check the shrunk coordinates before stopping
                active = n;
                pg_max_old = f64::INFINITY;
                continue;
            }

            pg_max_old = if pg_max_new <= 0.0 { f64::INFINITY } else { pg_max_new };
        }

        Ok(Self {
            weights,
            bias,
            iterations,
            converged,
        })
    }

    /// Signed distance-like score of every row of `x`
    pub fn decision_function(&self, x: &CsMat<f64>) -> Vec<f64> {
        x.outer_iterator()
            .map(|row| dot(&self.weights, &row) + self.bias)
            .collect()
    }

    /// Per-column weights, intercept excluded
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

fn dot(weights: &[f64], row: &CsVecView<'_, f64>) -> f64 {
    row.iter().map(|(col, v)| weights[col] * v).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn matrix(n_cols: usize, rows: &[&[(usize, f64)]]) -> CsMat<f64> {
        let mut tri = TriMat::new((rows.len(), n_cols));
        for (r, entries) in rows.iter().enumerate() {
            for &(c, v) in entries.iter() {
                tri.add_triplet(r, c, v);
            }
        }
        tri.to_csr()
    }

    fn identity(n: usize) -> CsMat<f64> {
        let rows: Vec<Vec<(usize, f64)>> = (0..n).map(|i| vec![(i, 1.0)]).collect();
        let refs: Vec<&[(usize, f64)]> = rows.iter().map(Vec::as_slice).collect();
        matrix(n, &refs)
    }

    #[test]
    fn test_single_positive_scores_highest() {
        let x = identity(5);
        let labels = [false, false, true, false, false];
        let svm = LinearSvm::fit(&x, &labels, &SvmParams::default()).unwrap();
        let scores = svm.decision_function(&x);

        assert!(svm.converged());
        for (i, &s) in scores.iter().enumerate() {
            if i != 2 {
                assert!(scores[2] > s, "row {} scored {} >= {}", i, s, scores[2]);
            }
        }
        assert!(svm.weights()[2] > 0.0);
    }

    #[test]
    fn test_two_clusters_separate() {
        // columns: 0 = "attention", 1 = "protein", 2 = shared noise
        let x = matrix(
            3,
            &[
                &[(0, 0.9), (2, 0.1)],
                &[(0, 0.8), (2, 0.3)],
                &[(1, 0.9), (2, 0.2)],
                &[(1, 0.7), (2, 0.1)],
                &[(1, 0.8)],
                &[(1, 0.6), (2, 0.4)],
            ],
        );
        let labels = [true, true, false, false, false, false];
        let params = SvmParams {
            c: 1.0,
            ..SvmParams::default()
        };
        let svm = LinearSvm::fit(&x, &labels, &params).unwrap();
        let scores = svm.decision_function(&x);

        let worst_pos = scores[..2].iter().cloned().fold(f64::INFINITY, f64::min);
        let best_neg = scores[2..].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(worst_pos > best_neg);
        assert!(svm.weights()[0] > 0.0);
        assert!(svm.weights()[1] < 0.0);
    }

    #[test]
    fn test_iteration_bound_reports_not_converged() {
        let x = identity(5);
        let labels = [true, false, false, false, false];
        let params = SvmParams {
            max_iter: 1,
            ..SvmParams::default()
        };
        let svm = LinearSvm::fit(&x, &labels, &params).unwrap();

        assert!(!svm.converged());
        assert_eq!(svm.iterations(), 1);
        assert_eq!(svm.decision_function(&x).len(), 5);
    }

    #[test]
    fn test_converging_on_last_allowed_pass() {
        let x = identity(5);
        let labels = [true, false, false, false, false];
        let free = LinearSvm::fit(&x, &labels, &SvmParams::default()).unwrap();
        assert!(free.converged());

        // same seed, same passes; the cap equals the pass that stopped
        let params = SvmParams {
            max_iter: free.iterations(),
            ..SvmParams::default()
        };
        let capped = LinearSvm::fit(&x, &labels, &params).unwrap();
        assert_eq!(capped.iterations(), free.iterations());
        assert!(capped.converged());
        assert_eq!(capped.weights(), free.weights());
    }

    #[test]
    fn test_same_seed_same_model() {
        let x = identity(6);
        let labels = [false, true, false, true, false, false];
        let a = LinearSvm::fit(&x, &labels, &SvmParams::default()).unwrap();
        let b = LinearSvm::fit(&x, &labels, &SvmParams::default()).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.bias(), b.bias());
    }

    #[test]
    fn test_rejects_single_class() {
        let x = identity(3);
        assert!(LinearSvm::fit(&x, &[false, false, false], &SvmParams::default()).is_err());
        assert!(LinearSvm::fit(&x, &[true, true, true], &SvmParams::default()).is_err());
    }

    #[test]
    fn test_rejects_misaligned_labels() {
        let x = identity(3);
        assert!(LinearSvm::fit(&x, &[true, false], &SvmParams::default()).is_err());
    }

    #[test]
    fn test_rejects_non_positive_c() {
        let x = identity(2);
        let params = SvmParams {
            c: 0.0,
            ..SvmParams::default()
        };
        assert!(LinearSvm::fit(&x, &[true, false], &params).is_err());
    }
}
