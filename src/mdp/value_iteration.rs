//! Value iteration on a tabular MDP.
//!
//! Rewards are attributed to the originating state:
//!
//! `V(s) = max_a Σ_{s'} T(s, a, s') · (r(s) + γ · V(s'))`

use super::sweep_states;
use super::transition::{validate, TransitionModel};
use crate::error::{Error, Result};
use crate::policy::ActionValues;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1};

/// Output of [`value_iteration`].
#[derive(Debug, Clone)]
pub struct ValueFunction {
    /// State values, one per state.
    pub values: Array1<f64>,
    /// Greedy action values `Q(s, a)` derived from `values`.
    pub q_values: Array2<f64>,
    /// Number of sweeps performed.
    pub iterations: usize,
    /// `max_s |V^{k+1}(s) - V^k(s)|` of the last sweep.
    pub delta: f64,
    gamma: f64,
}

impl ValueFunction {
    /// Discount factor the values were computed with.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Greedy action of every state. The lowest action index wins ties.
    pub fn greedy_policy(&self) -> Vec<usize> {
        (0..self.values.len())
            .map(|s| argmax(self.q_values.row(s)))
            .collect()
    }

    /// Largest Bellman optimality residual `|V(s) - max_a Q(s, a)|`.
    pub fn bellman_residual(&self) -> f64 {
        self.q_values
            .rows()
            .into_iter()
            .zip(self.values.iter())
            .map(|(q, &v)| (v - q.fold(f64::NEG_INFINITY, |m, &x| m.max(x))).abs())
            .fold(0.0, f64::max)
    }
}

impl ActionValues for ValueFunction {
    fn num_states(&self) -> usize {
        self.q_values.nrows()
    }

    fn num_actions(&self) -> usize {
        self.q_values.ncols()
    }

    fn action_values(&self, state: usize) -> ArrayView1<'_, f64> {
        self.q_values.row(state)
    }
}

/// Performs value iteration, returning the value function and its action values.
///
/// # Arguments
/// - `transition`: the transition model
/// - `reward`: one reward per state
/// - `gamma`: discount factor in `(0, 1)`
/// - `tolerance`: stop once the largest change of a sweep is below this
/// - `max_iterations`: sweep cap; hitting it is not an error, the partially
///   converged values are returned and `delta` tells how far off they are
///
/// # Examples
///
/// ```
/// use maxent_irl::mdp::{value_iteration, TabularTransition};
/// use ndarray::arr1;
///
/// // State 0 can stay or move to the rewarding state 1, which self-loops.
/// let t = TabularTransition::deterministic(2, 2, |s, a| if s == 1 { 1 } else { a }).unwrap();
/// let vf = value_iteration(&t, arr1(&[0.0, 1.0]).view(), 0.9, 1e-8, 1000).unwrap();
///
/// assert_eq!(vf.greedy_policy()[0], 1);
/// assert!((vf.values[1] - 10.0).abs() < 1e-6);
/// ```
pub fn value_iteration<T: TransitionModel + ?Sized>(
    transition: &T,
    reward: ArrayView1<'_, f64>,
    gamma: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<ValueFunction> {
    let n_s = transition.num_states();
    let n_a = transition.num_actions();
    if reward.len() != n_s {
        return Err(Error::dimension("reward", n_s, reward.len()));
    }
    if !(gamma > 0.0 && gamma < 1.0) {
        return Err(Error::InvalidParameter(format!(
            "gamma must be in (0, 1), got {}",
            gamma
        )));
    }
    if !(tolerance > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "tolerance must be positive, got {}",
            tolerance
        )));
    }
    validate(transition)?;

    let mut v = Array1::<f64>::zeros(n_s);
    let mut delta = f64::INFINITY;
    let mut iterations = 0;

    while iterations < max_iterations {
        let v_new = sweep_states(n_s, |s| {
            (0..n_a)
                .map(|a| transition.backup(s, a, reward[s], gamma, v.view()))
                .fold(f64::NEG_INFINITY, f64::max)
        });
        delta = (&v_new - &v).fold(0.0, |m: f64, &d| m.max(d.abs()));
        v = v_new;
        iterations += 1;
        if delta < tolerance {
            break;
        }
    }

    if !v.iter().all(|x| x.is_finite()) {
        return Err(Error::NumericalInstability(
            "value iteration produced a non-finite value".to_string(),
        ));
    }
    if delta >= tolerance {
        warn!(
            "value iteration stopped after {} sweeps with delta {:.3e}",
            iterations, delta
        );
    } else {
        debug!("value iteration converged in {} sweeps", iterations);
    }

    let q_values = Array2::from_shape_fn((n_s, n_a), |(s, a)| {
        transition.backup(s, a, reward[s], gamma, v.view())
    });

    Ok(ValueFunction {
        values: v,
        q_values,
        iterations,
        delta,
        gamma,
    })
}

/// Index of the largest entry; the first one on ties.
pub(crate) fn argmax(values: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    best
}
