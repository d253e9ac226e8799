//! Soft (maximum-entropy) value iteration.
//!
//! Same expectation as [`value_iteration`](crate::mdp::value_iteration) but the
//! hard max over actions is replaced by a log-sum-exp:
//!
//! `Q(s, a) = r(s) + γ · Σ_{s'} T(s, a, s') · V(s')`,
//! `V(s) = log Σ_a exp Q(s, a)`.
//!
//! Goal states are absorbing: their value is pinned to their own reward and
//! they are never backed up.

use crate::error::{Error, Result};
use crate::mdp::{sweep_states, validate, TransitionModel};
use crate::policy::ActionValues;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Output of [`soft_value_iteration`].
#[derive(Debug, Clone)]
pub struct SoftPolicy {
    /// Soft state values.
    pub values: Array1<f64>,
    /// Soft action values.
    pub q_values: Array2<f64>,
    /// `π(a | s)`, one row per state. Goal rows are uniform.
    pub policy: Array2<f64>,
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Largest value change of the last sweep.
    pub delta: f64,
}

impl SoftPolicy {
    /// Action distribution of `state`.
    pub fn action_probabilities(&self, state: usize) -> ArrayView1<'_, f64> {
        self.policy.row(state)
    }
}

impl ActionValues for SoftPolicy {
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

/// `log Σ exp(x)`, shifted by the maximum.
pub fn log_sum_exp(x: ArrayView1<'_, f64>) -> f64 {
    let max = x.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    if !max.is_finite() {
        return max;
    }
    max + x.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}

/// Runs the soft backward pass and derives the stochastic policy
/// `π(a | s) = exp(Q(s, a) - V(s))`.
///
/// `goal_mask[s]` marks absorbing goal states. Iteration stops once the
/// largest change drops below `tolerance` or after `max_iterations` sweeps.
pub fn soft_value_iteration<T: TransitionModel + ?Sized>(
    transition: &T,
    reward: ArrayView1<'_, f64>,
    goal_mask: &[bool],
    discount: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<SoftPolicy> {
    let n_s = transition.num_states();
    let n_a = transition.num_actions();
    if reward.len() != n_s {
        return Err(Error::dimension("reward", n_s, reward.len()));
    }
    if goal_mask.len() != n_s {
        return Err(Error::dimension("goal mask", n_s, goal_mask.len()));
    }
    if !(discount > 0.0 && discount <= 1.0) {
        return Err(Error::InvalidParameter(format!(
            "discount must be in (0, 1], got {}",
            discount
        )));
    }
    if !(tolerance > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "tolerance must be positive, got {}",
            tolerance
        )));
    }
    validate(transition)?;

    let q_row = |s: usize, v: ArrayView1<'_, f64>| -> Array1<f64> {
        Array1::from_iter((0..n_a).map(|a| transition.backup(s, a, reward[s], discount, v)))
    };

    let mut v = Array1::from_shape_fn(n_s, |s| if goal_mask[s] { reward[s] } else { 0.0 });
    let mut delta = f64::INFINITY;
    let mut iterations = 0;

    while iterations < max_iterations {
        let v_new = sweep_states(n_s, |s| {
            if goal_mask[s] {
                reward[s]
            } else {
                log_sum_exp(q_row(s, v.view()).view())
            }
        });
        if !v_new.iter().all(|x| x.is_finite()) {
            return Err(Error::NumericalInstability(format!(
                "soft value iteration produced a non-finite value at sweep {}",
                iterations + 1
            )));
        }
        delta = (&v_new - &v).fold(0.0, |m: f64, &d| m.max(d.abs()));
        v = v_new;
        iterations += 1;
        if delta < tolerance {
            break;
        }
    }

    if delta >= tolerance {
        warn!(
            "soft value iteration stopped after {} sweeps with delta {:.3e}",
            iterations, delta
        );
    } else {
        debug!("soft value iteration converged in {} sweeps", iterations);
    }

    let mut q_values = Array2::zeros((n_s, n_a));
    let mut policy = Array2::zeros((n_s, n_a));
    for (s, (mut q, mut pi)) in q_values
        .axis_iter_mut(Axis(0))
        .zip(policy.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        q.assign(&q_row(s, v.view()));
        if goal_mask[s] {
            pi.fill(1.0 / n_a as f64);
        } else {
            // Rows sum to one even when the sweep cap was hit.
            let z = log_sum_exp(q.view());
            pi.assign(&q.mapv(|x| (x - z).exp()));
        }
    }

    if !policy.iter().all(|x| x.is_finite()) {
        return Err(Error::NumericalInstability(
            "soft policy contains a non-finite probability".to_string(),
        ));
    }

    Ok(SoftPolicy {
        values: v,
        q_values,
        policy,
        iterations,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdp::TabularTransition;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    const PHI: f64 = 1.618_033_988_749_895;

    // State 0: action 0 stays, action 1 moves to the goal state 1.
    fn chain() -> TabularTransition {
        TabularTransition::deterministic(2, 2, |s, a| if s == 1 { 1 } else { a }).unwrap()
    }

    #[test]
    fn test_two_state_closed_form() {
        let t = chain();
        let reward = arr1(&[0.0, 0.0]);
        let sp = soft_value_iteration(&t, reward.view(), &[false, true], 0.5, 1e-12, 10_000)
            .unwrap();

        // V(0) = log(exp(V(0) / 2) + 1)  =>  exp(V(0) / 2) = φ.
        assert_relative_eq!(sp.values[1], 0.0);
        assert_relative_eq!(sp.values[0], 2.0 * PHI.ln(), epsilon = 1e-9);
        assert_relative_eq!(sp.policy[[0, 0]], 1.0 / PHI, epsilon = 1e-9);
        assert_relative_eq!(sp.policy[[0, 1]], 1.0 / (PHI * PHI), epsilon = 1e-9);
        assert_relative_eq!(sp.policy[[1, 0]], 0.5);
    }

    #[test]
    fn test_goal_value_is_pinned_to_its_reward() {
        let t = chain();
        let reward = arr1(&[-1.0, 3.0]);
        let sp = soft_value_iteration(&t, reward.view(), &[false, true], 0.9, 1e-10, 10_000)
            .unwrap();
        assert_relative_eq!(sp.values[1], 3.0);
        // Moving to the goal dominates staying.
        assert!(sp.policy[[0, 1]] > sp.policy[[0, 0]]);
    }

    #[test]
    fn test_rows_are_distributions_at_the_cap() {
        let t = chain();
        let reward = arr1(&[1.0, 0.0]);
        let sp = soft_value_iteration(&t, reward.view(), &[false, false], 1.0, 1e-12, 5).unwrap();
        assert_eq!(sp.iterations, 5);
        for row in sp.policy.rows() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_large_rewards_stay_finite() {
        let t = chain();
        let reward = arr1(&[500.0, 800.0]);
        let sp = soft_value_iteration(&t, reward.view(), &[false, true], 0.9, 1e-9, 10_000)
            .unwrap();
        assert!(sp.values.iter().all(|v| v.is_finite()));
        assert!(sp.policy.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_log_sum_exp() {
        assert_relative_eq!(
            log_sum_exp(arr1(&[1000.0, 1000.0]).view()),
            1000.0 + 2f64.ln()
        );
        assert_eq!(
            log_sum_exp(arr1(&[f64::NEG_INFINITY, f64::NEG_INFINITY]).view()),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_goal_mask_length() {
        let t = chain();
        let reward = arr1(&[0.0, 0.0]);
        assert!(matches!(
            soft_value_iteration(&t, reward.view(), &[true], 0.9, 1e-6, 10),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_tolerance() {
        let t = chain();
        let reward = arr1(&[0.0, 0.0]);
        for tolerance in [0.0, -1e-6, f64::NAN] {
            assert!(matches!(
                soft_value_iteration(&t, reward.view(), &[false, true], 0.9, tolerance, 10),
                Err(Error::InvalidParameter(_))
            ));
        }
    }
}
