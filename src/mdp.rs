//! Tabular MDP solvers.
//!
//! [`value_iteration`] solves the Bellman optimality equations exactly from a
//! transition table; [`q_learning`] reaches the same fixed point from sampled
//! transitions only.
pub mod q_learning;
pub mod transition;
pub mod value_iteration;

pub use q_learning::{q_learning, QFunction, QLearningConfig};
pub use transition::{validate, TabularTransition, TransitionModel, TransitionSampler};
pub use value_iteration::{value_iteration, ValueFunction};

use ndarray::Array1;

/// Evaluates `f` for every state and collects the results into a fresh array.
///
/// Each call is one synchronous sweep: `f` only reads arrays produced by the
/// previous sweep.
#[cfg(feature = "parallel")]
pub(crate) fn sweep_states<F>(num_states: usize, f: F) -> Array1<f64>
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    use rayon::prelude::*;
    let values: Vec<f64> = (0..num_states).into_par_iter().map(f).collect();
    Array1::from(values)
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn sweep_states<F>(num_states: usize, f: F) -> Array1<f64>
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    Array1::from_iter((0..num_states).map(f))
}
