//! Transition models.
//!
//! The solvers only read transitions through [`TransitionModel`]. A dense
//! `|S| x |A| x |S|` table ([`TabularTransition`]) is provided for grid-sized
//! problems; anything that can answer `T(s, a, s')` and hand out a successor
//! row can be plugged in instead.

use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView1};
use rand::Rng;

/// Allowed deviation of a row sum from one.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// A transition model `T(s, a, s')` over discrete states and actions.
pub trait TransitionModel: Sync {
    /// Number of states `|S|`.
    fn num_states(&self) -> usize;

    /// Number of actions `|A|`.
    fn num_actions(&self) -> usize;

    /// Successor distribution of `(state, action)`, one entry per next state.
    fn successors(&self, state: usize, action: usize) -> ArrayView1<'_, f64>;

    /// Probability of landing in `next_state` after taking `action` in `state`.
    fn probability(&self, state: usize, action: usize, next_state: usize) -> f64 {
        self.successors(state, action)[next_state]
    }

    /// Expected backed-up value `Σ_{s'} T(s,a,s') · (reward + gamma · values[s'])`.
    ///
    /// Zero-probability successors are skipped, so `values` may hold `-inf`.
    fn backup(
        &self,
        state: usize,
        action: usize,
        reward: f64,
        gamma: f64,
        values: ArrayView1<'_, f64>,
    ) -> f64 {
        self.successors(state, action)
            .iter()
            .zip(values.iter())
            .filter(|(&p, _)| p > 0.0)
            .map(|(&p, &v)| p * (reward + gamma * v))
            .sum()
    }
}

/// Checks that every `(s, a)` row of `transition` is a probability distribution.
pub fn validate<T: TransitionModel + ?Sized>(transition: &T) -> Result<()> {
    for state in 0..transition.num_states() {
        for action in 0..transition.num_actions() {
            let row = transition.successors(state, action);
            if row.len() != transition.num_states() {
                return Err(Error::dimension(
                    format!("successors of ({}, {})", state, action),
                    transition.num_states(),
                    row.len(),
                ));
            }
            let sum: f64 = row.sum();
            let negative = row.iter().any(|&p| p < 0.0);
            if negative || (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(Error::InvalidTransitionModel { state, action, sum });
            }
        }
    }
    Ok(())
}

/// Draws successor states from a model that may only be reachable as a sampler.
pub trait TransitionSampler {
    /// Number of states `|S|`.
    fn state_count(&self) -> usize;

    /// Number of actions `|A|`.
    fn action_count(&self) -> usize;

    /// Samples `s' ~ T(s, a, .)`.
    fn sample_next<R: Rng + ?Sized>(&self, state: usize, action: usize, rng: &mut R) -> usize;
}

impl<T: TransitionModel> TransitionSampler for T {
    fn state_count(&self) -> usize {
        self.num_states()
    }

    fn action_count(&self) -> usize {
        self.num_actions()
    }

    fn sample_next<R: Rng + ?Sized>(&self, state: usize, action: usize, rng: &mut R) -> usize {
        let row = self.successors(state, action);
        let sample = rng.gen::<f64>();
        let mut cumsum = 0.0;
        let mut last_reachable = state;
        for (next, &p) in row.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            cumsum += p;
            last_reachable = next;
            if sample < cumsum {
                return next;
            }
        }
        // Rounding left the cumulative sum just below one.
        last_reachable
    }
}

/// Dense transition table indexed `[s, a, s']`.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularTransition {
    table: Array3<f64>,
}

impl TabularTransition {
    /// Wraps a `|S| x |A| x |S|` table, validating every row.
    pub fn new(table: Array3<f64>) -> Result<Self> {
        let (n_s, _, n_next) = table.dim();
        if n_s != n_next {
            return Err(Error::dimension("transition table next-state axis", n_s, n_next));
        }
        let model = Self { table };
        validate(&model)?;
        Ok(model)
    }

    /// Builds a table from `f(s, a, s')`.
    pub fn from_fn<F>(num_states: usize, num_actions: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize, usize) -> f64,
    {
        let table = Array3::from_shape_fn((num_states, num_actions, num_states), |(s, a, n)| {
            f(s, a, n)
        });
        Self::new(table)
    }

    /// Builds a deterministic table from a successor function `next(s, a)`.
    pub fn deterministic<F>(num_states: usize, num_actions: usize, next: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> usize,
    {
        let mut table = Array3::zeros((num_states, num_actions, num_states));
        for s in 0..num_states {
            for a in 0..num_actions {
                let n = next(s, a);
                if n >= num_states {
                    return Err(Error::dimension("deterministic successor", num_states, n));
                }
                table[[s, a, n]] = 1.0;
            }
        }
        Self::new(table)
    }

    /// The underlying table.
    pub fn table(&self) -> &Array3<f64> {
        &self.table
    }
}

impl TransitionModel for TabularTransition {
    fn num_states(&self) -> usize {
        self.table.dim().0
    }

    fn num_actions(&self) -> usize {
        self.table.dim().1
    }

    fn successors(&self, state: usize, action: usize) -> ArrayView1<'_, f64> {
        self.table.slice(ndarray::s![state, action, ..])
    }
}
