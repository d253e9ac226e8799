use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};

const PIVOT_EPSILON: f64 = 1e-12;

/// State features `F`, one row per state and one column per feature.
///
/// The reward of a weight vector `w` is `F · w`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    matrix: Array2<f64>,
}

impl FeatureMatrix {
    /// Wraps an `|S| x K` matrix of finite values.
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        if matrix.ncols() == 0 {
            return Err(Error::InvalidParameter(
                "feature matrix needs at least one feature".to_string(),
            ));
        }
        if !matrix.iter().all(|x| x.is_finite()) {
            return Err(Error::NumericalInstability(
                "feature matrix contains a non-finite value".to_string(),
            ));
        }
        Ok(Self { matrix })
    }

    /// One-hot features: state `s` maps to the `s`-th unit vector.
    pub fn identity(num_states: usize) -> Self {
        Self {
            matrix: Array2::eye(num_states),
        }
    }

    /// Number of rows.
    pub fn num_states(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of columns `K`.
    pub fn num_features(&self) -> usize {
        self.matrix.ncols()
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// `F · weights`.
    pub fn reward(&self, weights: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if weights.len() != self.num_features() {
            return Err(Error::dimension("weights", self.num_features(), weights.len()));
        }
        Ok(self.matrix.dot(&weights))
    }

    /// Feature expectations `Fᵀ · density` of a state distribution.
    pub fn expectations(&self, density: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if density.len() != self.num_states() {
            return Err(Error::dimension("state density", self.num_states(), density.len()));
        }
        Ok(self.matrix.t().dot(&density))
    }

    /// Weights `w` minimizing `|F · w - reward|²`.
    ///
    /// Solves the normal equations `FᵀF · w = Fᵀ · reward` by Gauss-Jordan
    /// elimination with partial pivoting.
    pub fn least_squares_weights(&self, reward: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if reward.len() != self.num_states() {
            return Err(Error::dimension("reward", self.num_states(), reward.len()));
        }
        let normal = self.matrix.t().dot(&self.matrix);
        let rhs = self.matrix.t().dot(&reward);
        solve(normal, rhs)
    }
}

/// Solves `a · x = b` in place on the augmented system.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let dim = b.len();
    let scale = a.iter().fold(0.0_f64, |m, x| m.max(x.abs())).max(1.0);

    for i in 0..dim {
        // Find pivot
        let mut pivot_row = i;
        let mut pivot_val = a[[i, i]].abs();
        for r in (i + 1)..dim {
            let val = a[[r, i]].abs();
            if val > pivot_val {
                pivot_row = r;
                pivot_val = val;
            }
        }
        if pivot_val < PIVOT_EPSILON * scale {
            return Err(Error::RankDeficient);
        }
        if pivot_row != i {
            for c in 0..dim {
                a.swap([i, c], [pivot_row, c]);
            }
            b.swap(i, pivot_row);
        }

        let pivot = a[[i, i]];
        a.row_mut(i).mapv_inplace(|x| x / pivot);
        b[i] /= pivot;

        let normalized = a.row(i).to_owned();
        for r in 0..dim {
            if r != i {
                let factor = a[[r, i]];
                if factor != 0.0 {
                    a.index_axis_mut(Axis(0), r).scaled_add(-factor, &normalized);
                    let bi = b[i];
                    b[r] -= factor * bi;
                }
            }
        }
    }

    if !b.iter().all(|x| x.is_finite()) {
        return Err(Error::NumericalInstability(
            "least-squares solution is not finite".to_string(),
        ));
    }
    Ok(b)
}
