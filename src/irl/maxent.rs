use super::config::MaxEntIrlConfig;
use super::features::FeatureMatrix;
use super::soft_value::{soft_value_iteration, SoftPolicy};
use super::visitation::{
    estimate, estimate_with_terminals, expected_visitation, initial_state_distribution,
};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::mdp::{validate, TransitionModel};
use log::{debug, info};
use ndarray::{Array1, ArrayView1};
use rand::Rng;

/// Summary of one gradient step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStats {
    /// Zero-based index of the step.
    pub iteration: usize,
    /// Annealed learning rate the step used.
    pub learning_rate: f64,
    /// Euclidean norm of the gradient.
    pub gradient_norm: f64,
    /// `Σ_s |D_empirical(s) - D_expected(s)|`.
    pub visitation_l1: f64,
    /// Sweeps of the soft backward pass.
    pub soft_iterations: usize,
}

/// Maximum-entropy IRL on a tabular MDP.
///
/// Fits weights `w` of a linear reward `r = F · w` so that the soft-optimal
/// policy under `r` visits states as often as the demonstrations do.
///
/// # Examples
///
/// ```
/// use maxent_irl::dataset::{Dataset, Trajectory};
/// use maxent_irl::irl::{FeatureMatrix, MaxEntIrl, MaxEntIrlConfig};
/// use maxent_irl::mdp::TabularTransition;
///
/// // Corridor 0 -> 1 -> 2, action 0 stays, action 1 moves right; 2 is the goal.
/// let t = TabularTransition::deterministic(3, 2, |s, a| if s == 2 { 2 } else { s + a })
///     .unwrap();
/// let demos = Dataset::new(vec![Trajectory::from_states(&[0, 1, 2], true); 3]);
///
/// let mut irl = MaxEntIrl::new(
///     &t,
///     FeatureMatrix::identity(3),
///     &[2],
///     &demos,
///     MaxEntIrlConfig::default().max_iter(5),
/// )
/// .unwrap();
/// let reward = irl.train().unwrap();
/// assert_eq!(reward.len(), 3);
/// assert_eq!(irl.history().len(), 5);
/// ```
pub struct MaxEntIrl<'a, T: TransitionModel + ?Sized> {
    transition: &'a T,
    features: FeatureMatrix,
    goal_mask: Vec<bool>,
    empirical: Array1<f64>,
    initial: Array1<f64>,
    horizon: usize,
    config: MaxEntIrlConfig,
    weights: Array1<f64>,
    iteration: usize,
    history: Vec<IterationStats>,
}

impl<'a, T: TransitionModel + ?Sized> MaxEntIrl<'a, T> {
    /// Prepares a trainer from demonstrations.
    ///
    /// Every weight starts at `config.initial_weight`.
    pub fn new(
        transition: &'a T,
        features: FeatureMatrix,
        goal_states: &[usize],
        dataset: &Dataset,
        config: MaxEntIrlConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate(transition)?;

        let n_s = transition.num_states();
        if features.num_states() != n_s {
            return Err(Error::dimension("feature rows", n_s, features.num_states()));
        }
        let mut goal_mask = vec![false; n_s];
        for &g in goal_states {
            *goal_mask
                .get_mut(g)
                .ok_or_else(|| Error::dimension("goal state", n_s, g))? = true;
        }
        if dataset.num_records() == 0 {
            return Err(Error::EmptyDataset);
        }

        let empirical = if config.count_terminal_arrivals {
            estimate_with_terminals(dataset, n_s)?
        } else {
            estimate(dataset, n_s)?
        };
        let initial = match config.start_state {
            Some(s) if s >= n_s => return Err(Error::dimension("start state", n_s, s)),
            Some(s) => {
                let mut p0 = Array1::zeros(n_s);
                p0[s] = 1.0;
                p0
            }
            None => initial_state_distribution(dataset, n_s)?,
        };
        let horizon = config.horizon.unwrap_or_else(|| dataset.max_trajectory_len());
        let weights = Array1::from_elem(features.num_features(), config.initial_weight);

        debug!(
            "maxent irl: {} states, {} features, {} trajectories, horizon {}",
            n_s,
            features.num_features(),
            dataset.len(),
            horizon
        );

        Ok(Self {
            transition,
            features,
            goal_mask,
            empirical,
            initial,
            horizon,
            config,
            weights,
            iteration: 0,
            history: Vec::new(),
        })
    }

    /// Replaces the starting weights.
    pub fn with_weights(mut self, weights: Array1<f64>) -> Result<Self> {
        if weights.len() != self.features.num_features() {
            return Err(Error::dimension(
                "weights",
                self.features.num_features(),
                weights.len(),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    /// Draws every weight uniformly from `[0, 1)`.
    pub fn randomize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.weights.mapv_inplace(|_| rng.gen::<f64>());
    }

    /// Performs one gradient step.
    pub fn step(&mut self) -> Result<IterationStats> {
        let reward = self.reward();
        let soft = self.soft_policy_for(reward.view())?;
        let expected = expected_visitation(
            self.transition,
            soft.policy.view(),
            self.initial.view(),
            &self.goal_mask,
            self.horizon,
            self.config.count_terminal_arrivals,
        )?;

        let diff = &self.empirical - &expected;
        let grad = self.features.expectations(diff.view())?;
        let learning_rate =
            self.config.learning_rate * self.config.anneal_rate.powi(self.iteration as i32);
        self.weights.scaled_add(learning_rate, &grad);

        if !self.weights.iter().all(|w| w.is_finite()) {
            return Err(Error::NumericalInstability(format!(
                "weights became non-finite at iteration {}",
                self.iteration
            )));
        }

        let stats = IterationStats {
            iteration: self.iteration,
            learning_rate,
            gradient_norm: grad.dot(&grad).sqrt(),
            visitation_l1: diff.fold(0.0, |acc, d| acc + d.abs()),
            soft_iterations: soft.iterations,
        };
        info!(
            "iteration {}: lr {:.4}, |grad| {:.4e}, |D_emp - D_exp|_1 {:.4e}",
            stats.iteration, stats.learning_rate, stats.gradient_norm, stats.visitation_l1
        );
        self.iteration += 1;
        self.history.push(stats);
        Ok(stats)
    }

    /// Runs `config.max_iter` gradient steps and returns the learned reward.
    pub fn train(&mut self) -> Result<Array1<f64>> {
        for _ in 0..self.config.max_iter {
            self.step()?;
        }
        Ok(self.reward())
    }

    /// `F · w` for the current weights.
    pub fn reward(&self) -> Array1<f64> {
        self.features.matrix().dot(&self.weights)
    }

    /// Current weights.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Statistics of every step taken so far.
    pub fn history(&self) -> &[IterationStats] {
        &self.history
    }

    /// Empirical state visitation of the demonstrations.
    pub fn empirical_visitation(&self) -> &Array1<f64> {
        &self.empirical
    }

    /// Forward-pass horizon in use.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Configuration in use.
    pub fn config(&self) -> &MaxEntIrlConfig {
        &self.config
    }

    /// Soft-optimal policy under the current reward.
    pub fn soft_policy(&self) -> Result<SoftPolicy> {
        self.soft_policy_for(self.reward().view())
    }

    fn soft_policy_for(&self, reward: ArrayView1<'_, f64>) -> Result<SoftPolicy> {
        soft_value_iteration(
            self.transition,
            reward,
            &self.goal_mask,
            self.config.discount,
            self.config.soft_tolerance,
            self.config.soft_max_iterations,
        )
    }
}
