use super::transition::TransitionSampler;
use crate::error::{Error, Result};
use crate::policy::{ActionValues, Policy};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;

/// Configuration for tabular Q-learning.
#[derive(Debug, Clone, PartialEq)]
pub struct QLearningConfig {
    /// Discount factor in `(0, 1)`.
    pub gamma: f64,
    /// Step size of the temporal-difference update, in `(0, 1]`.
    pub learning_rate: f64,
    /// Exploration rate of the epsilon-greedy behavior policy.
    pub epsilon: f64,
    /// Number of simulated episodes.
    pub episodes: usize,
    /// Steps per episode.
    pub max_steps: usize,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            learning_rate: 0.1,
            epsilon: 0.1,
            episodes: 500,
            max_steps: 100,
        }
    }
}

impl QLearningConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the step size.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the exploration rate.
    pub fn epsilon(mut self, v: f64) -> Self {
        self.epsilon = v;
        self
    }

    /// Sets the number of episodes.
    pub fn episodes(mut self, v: usize) -> Self {
        self.episodes = v;
        self
    }

    /// Sets the number of steps per episode.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "gamma must be in (0, 1), got {}",
                self.gamma
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::InvalidParameter(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Tabular action-value function.
#[derive(Debug, Clone)]
pub struct QFunction {
    /// `Q(s, a)`, one row per state.
    pub q_values: Array2<f64>,
}

impl QFunction {
    /// A zero-initialized table.
    pub fn zeros(num_states: usize, num_actions: usize) -> Self {
        Self {
            q_values: Array2::zeros((num_states, num_actions)),
        }
    }

    /// `V(s) = max_a Q(s, a)`.
    pub fn values(&self) -> Array1<f64> {
        Array1::from_iter(
            self.q_values
                .rows()
                .into_iter()
                .map(|q| q.fold(f64::NEG_INFINITY, |m, &x| m.max(x))),
        )
    }

    fn max_value(&self, state: usize) -> f64 {
        self.q_values
            .row(state)
            .fold(f64::NEG_INFINITY, |m, &x| m.max(x))
    }
}

impl ActionValues for QFunction {
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

/// Learns `Q` from sampled transitions with an off-policy TD update:
///
/// `Q(s,a) <- Q(s,a) + α · (r(s) + γ · max_a' Q(s',a') - Q(s,a))`
///
/// Episodes start in a uniformly random state and behave epsilon-greedily;
/// the exploration only shapes which transitions are sampled, never the target.
pub fn q_learning<T, R>(
    transition: &T,
    reward: ArrayView1<'_, f64>,
    config: &QLearningConfig,
    rng: &mut R,
) -> Result<QFunction>
where
    T: TransitionSampler + ?Sized,
    R: Rng + ?Sized,
{
    let n_s = transition.state_count();
    let n_a = transition.action_count();
    if reward.len() != n_s {
        return Err(Error::dimension("reward", n_s, reward.len()));
    }
    config.validate()?;

    let behavior = Policy::epsilon_greedy(config.epsilon)?;
    let mut q = QFunction::zeros(n_s, n_a);

    for episode in 0..config.episodes {
        let mut state = rng.gen_range(0..n_s);
        for _ in 0..config.max_steps {
            let action = behavior.select_action(&q, state, rng)?;
            let next_state = transition.sample_next(state, action, rng);

            let target = reward[state] + config.gamma * q.max_value(next_state);
            let current = q.q_values[[state, action]];
            q.q_values[[state, action]] = current + config.learning_rate * (target - current);

            state = next_state;
        }
        if (episode + 1) % 100 == 0 {
            debug!("q-learning: {} episodes done", episode + 1);
        }
    }

    if !q.q_values.iter().all(|x| x.is_finite()) {
        return Err(Error::NumericalInstability(
            "q-learning produced a non-finite value".to_string(),
        ));
    }
    Ok(q)
}
