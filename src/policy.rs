//! Action-selection rules over a value or Q function.
use crate::error::{Error, Result};
use crate::mdp::value_iteration::argmax;
use ndarray::{Array1, ArrayView1};
use rand::Rng;

/// Anything that can report `Q(s, .)` for a state.
pub trait ActionValues {
    /// Number of states covered.
    fn num_states(&self) -> usize;

    /// Number of actions per state.
    fn num_actions(&self) -> usize;

    /// Action values of `state`, one per action.
    fn action_values(&self, state: usize) -> ArrayView1<'_, f64>;
}

/// Policy variants turning action values into an action-sampling rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// Always the argmax action (lowest index on ties).
    Greedy,

    /// The argmax with probability `1 - epsilon`, a uniform action otherwise.
    EpsilonGreedy {
        /// Exploration rate in `[0, 1]`.
        epsilon: f64,
    },

    /// Samples `softmax(Q / temperature)`.
    StochasticGreedy {
        /// Softmax temperature, must be positive.
        temperature: f64,
    },
}

impl Policy {
    /// Epsilon-greedy policy, `epsilon` in `[0, 1]`.
    pub fn epsilon_greedy(epsilon: f64) -> Result<Self> {
        let policy = Policy::EpsilonGreedy { epsilon };
        policy.validate()?;
        Ok(policy)
    }

    /// Softmax policy, `temperature` positive and finite.
    pub fn stochastic_greedy(temperature: f64) -> Result<Self> {
        let policy = Policy::StochasticGreedy { temperature };
        policy.validate()?;
        Ok(policy)
    }

    /// Checks the parameters of the variant.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Policy::Greedy => Ok(()),
            Policy::EpsilonGreedy { epsilon } if !(0.0..=1.0).contains(&epsilon) => Err(
                Error::InvalidParameter(format!("epsilon must be in [0, 1], got {}", epsilon)),
            ),
            Policy::StochasticGreedy { temperature }
                if !(temperature > 0.0 && temperature.is_finite()) =>
            {
                Err(Error::InvalidParameter(format!(
                    "temperature must be positive, got {}",
                    temperature
                )))
            }
            _ => Ok(()),
        }
    }

    /// Probability of every action in `state`.
    pub fn action_probabilities<Q: ActionValues + ?Sized>(
        &self,
        values: &Q,
        state: usize,
    ) -> Result<Array1<f64>> {
        self.validate()?;
        let q = values.action_values(state);
        let n_a = q.len();
        let probs = match *self {
            Policy::Greedy => {
                let mut probs = Array1::zeros(n_a);
                probs[argmax(q)] = 1.0;
                probs
            }
            Policy::EpsilonGreedy { epsilon } => {
                let mut probs = Array1::from_elem(n_a, epsilon / n_a as f64);
                probs[argmax(q)] += 1.0 - epsilon;
                probs
            }
            Policy::StochasticGreedy { temperature } => softmax(q, temperature),
        };
        Ok(probs)
    }

    /// Samples an action for `state` using the caller's random number generator.
    pub fn select_action<Q, R>(&self, values: &Q, state: usize, rng: &mut R) -> Result<usize>
    where
        Q: ActionValues + ?Sized,
        R: Rng + ?Sized,
    {
        self.validate()?;
        let action = match *self {
            Policy::Greedy => argmax(values.action_values(state)),
            Policy::EpsilonGreedy { epsilon } => {
                if rng.gen::<f64>() < epsilon {
                    rng.gen_range(0..values.num_actions())
                } else {
                    argmax(values.action_values(state))
                }
            }
            Policy::StochasticGreedy { .. } => {
                sample_index(self.action_probabilities(values, state)?.view(), rng)
            }
        };
        Ok(action)
    }
}

/// Numerically stable softmax of `q / temperature`.
pub fn softmax(q: ArrayView1<'_, f64>, temperature: f64) -> Array1<f64> {
    let max = q.fold(f64::NEG_INFINITY, |m, &x| m.max(x));
    let mut probs = q.mapv(|x| ((x - max) / temperature).exp());
    let z = probs.sum();
    probs /= z;
    probs
}

/// Draws an index from a categorical distribution.
pub(crate) fn sample_index<R: Rng + ?Sized>(probs: ArrayView1<'_, f64>, rng: &mut R) -> usize {
    let sample = rng.gen::<f64>();
    let mut cumsum = 0.0;
    let mut last_positive = 0;
    for (i, &p) in probs.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumsum += p;
        last_positive = i;
        if sample < cumsum {
            return i;
        }
    }
    // Rounding left the cumulative sum just below one.
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr2, Array2};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Table(Array2<f64>);

    impl ActionValues for Table {
        fn num_states(&self) -> usize {
            self.0.nrows()
        }
        fn num_actions(&self) -> usize {
            self.0.ncols()
        }
        fn action_values(&self, state: usize) -> ArrayView1<'_, f64> {
            self.0.row(state)
        }
    }

    fn table() -> Table {
        Table(arr2(&[[1.0, 3.0, 2.0, 3.0], [0.0, 0.0, 0.0, 0.0]]))
    }

    #[test]
    fn test_greedy_breaks_ties_on_lowest_index() {
        let q = table();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(Policy::Greedy.select_action(&q, 0, &mut rng).unwrap(), 1);
        assert_eq!(Policy::Greedy.select_action(&q, 1, &mut rng).unwrap(), 0);
        assert_eq!(
            Policy::Greedy.action_probabilities(&q, 0).unwrap().to_vec(),
            vec![0.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_epsilon_greedy_probabilities() {
        let q = table();
        let policy = Policy::epsilon_greedy(0.2).unwrap();
        let probs = policy.action_probabilities(&q, 0).unwrap();
        assert_relative_eq!(probs[1], 0.85);
        assert_relative_eq!(probs[0], 0.05);
        assert_relative_eq!(probs.sum(), 1.0);
    }

    #[test]
    fn test_epsilon_greedy_explores() {
        let q = table();
        let policy = Policy::EpsilonGreedy { epsilon: 1.0 };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[policy.select_action(&q, 0, &mut rng).unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_stochastic_greedy_is_softmax() {
        let q = table();
        let policy = Policy::StochasticGreedy { temperature: 1.0 };
        let probs = policy.action_probabilities(&q, 0).unwrap();
        let z = 1f64.exp() + 2.0 * 3f64.exp() + 2f64.exp();
        assert_relative_eq!(probs[0], 1f64.exp() / z, epsilon = 1e-12);
        assert_relative_eq!(probs[1], probs[3], epsilon = 1e-12);

        let uniform = policy.action_probabilities(&q, 1).unwrap();
        for p in uniform.iter() {
            assert_relative_eq!(*p, 0.25);
        }
    }

    #[test]
    fn test_softmax_handles_large_values() {
        let q = ndarray::arr1(&[1000.0, 1001.0]);
        let probs = softmax(q.view(), 1.0);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert_relative_eq!(probs[1], 1.0 / (1.0 + (-1f64).exp()), epsilon = 1e-12);
    }

    #[test]
    fn test_stochastic_greedy_sampling_frequencies() {
        let q = Table(arr2(&[[0.0, 2f64.ln()]]));
        let policy = Policy::StochasticGreedy { temperature: 1.0 };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = 30_000;
        let ones = (0..n)
            .filter(|_| policy.select_action(&q, 0, &mut rng).unwrap() == 1)
            .count();
        let freq = ones as f64 / n as f64;
        assert!((freq - 2.0 / 3.0).abs() < 0.02, "frequency was {}", freq);
    }

    #[test]
    fn test_rejects_out_of_range_parameters() {
        let q = table();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for policy in [
            Policy::EpsilonGreedy { epsilon: 2.0 },
            Policy::EpsilonGreedy { epsilon: -0.1 },
            Policy::StochasticGreedy { temperature: 0.0 },
            Policy::StochasticGreedy { temperature: f64::NAN },
        ] {
            assert!(matches!(policy.validate(), Err(Error::InvalidParameter(_))));
            assert!(matches!(
                policy.action_probabilities(&q, 0),
                Err(Error::InvalidParameter(_))
            ));
            assert!(matches!(
                policy.select_action(&q, 0, &mut rng),
                Err(Error::InvalidParameter(_))
            ));
        }
        assert!(Policy::epsilon_greedy(1.5).is_err());
        assert!(Policy::stochastic_greedy(-1.0).is_err());
        assert_eq!(
            Policy::stochastic_greedy(0.5).unwrap(),
            Policy::StochasticGreedy { temperature: 0.5 }
        );
    }

    #[test]
    fn test_sampling_never_returns_a_zero_probability_index() {
        // The mass sums to 0.6, so draws above it fall through the loop.
        let probs = ndarray::arr1(&[0.3, 0.3, 0.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = [0usize; 3];
        for _ in 0..1000 {
            seen[sample_index(probs.view(), &mut rng)] += 1;
        }
        assert_eq!(seen[2], 0);
        assert!(seen[1] > seen[0]);
    }
}
