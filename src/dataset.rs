//! Demonstration data: transition records, trajectories and their collection.
use crate::error::Result;
use crate::policy::{ActionValues, Policy};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One environment step `(s, a, s', r, done)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Originating state.
    pub state: usize,
    /// Action taken in `state`.
    pub action: usize,
    /// State the environment moved to.
    pub next_state: usize,
    /// Reward received for leaving `state`.
    pub reward: f64,
    /// Whether the episode ended in `next_state`.
    pub done: bool,
}

/// An ordered sequence of transition records from one episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    records: Vec<TransitionRecord>,
}

impl Trajectory {
    /// Wraps a sequence of records.
    pub fn new(records: Vec<TransitionRecord>) -> Self {
        Self { records }
    }

    /// Builds a trajectory from the visited states alone.
    ///
    /// Actions and rewards are zero; the last record is marked `done` when
    /// `terminated` is set.
    pub fn from_states(states: &[usize], terminated: bool) -> Self {
        let n = states.len().saturating_sub(1);
        let records = states
            .windows(2)
            .enumerate()
            .map(|(i, w)| TransitionRecord {
                state: w[0],
                action: 0,
                next_state: w[1],
                reward: 0.0,
                done: terminated && i + 1 == n,
            })
            .collect();
        Self { records }
    }

    /// Appends a record.
    pub fn push(&mut self, record: TransitionRecord) {
        self.records.push(record);
    }

    /// Records of the trajectory in order.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// Iterates over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, TransitionRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the trajectory has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// State the trajectory started in.
    pub fn first_state(&self) -> Option<usize> {
        self.records.first().map(|r| r.state)
    }

    /// Sum of rewards.
    pub fn total_reward(&self) -> f64 {
        self.records.iter().map(|r| r.reward).sum()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TransitionRecord;
    type IntoIter = std::slice::Iter<'a, TransitionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A fixed collection of trajectories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    trajectories: Vec<Trajectory>,
}

impl Dataset {
    /// Wraps a collection of trajectories.
    pub fn new(trajectories: Vec<Trajectory>) -> Self {
        Self { trajectories }
    }

    /// Trajectories in collection order.
    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// Iterates over the trajectories.
    pub fn iter(&self) -> std::slice::Iter<'_, Trajectory> {
        self.trajectories.iter()
    }

    /// Number of trajectories.
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    /// Whether there are no trajectories.
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Total number of transition records.
    pub fn num_records(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).sum()
    }

    /// Length of the longest trajectory.
    pub fn max_trajectory_len(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Trajectory;
    type IntoIter = std::slice::Iter<'a, Trajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.trajectories.iter()
    }
}

/// A discrete episodic environment that can be rolled out.
pub trait Environment {
    /// Number of states.
    fn num_states(&self) -> usize;

    /// Number of actions.
    fn num_actions(&self) -> usize;

    /// Starts a new episode and returns the initial state.
    fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize;

    /// Applies `action` to the current state.
    fn step<R: Rng + ?Sized>(&mut self, action: usize, rng: &mut R) -> TransitionRecord;
}

/// Rolls `policy` out in `env` to build a dataset.
///
/// Each trajectory stops when the environment reports `done` or after
/// `maxlen` records.
pub fn collect_trajectories<E, Q, R>(
    env: &mut E,
    policy: &Policy,
    values: &Q,
    num_trajectories: usize,
    maxlen: usize,
    rng: &mut R,
) -> Result<Dataset>
where
    E: Environment,
    Q: ActionValues + ?Sized,
    R: Rng + ?Sized,
{
    policy.validate()?;
    let mut trajectories = Vec::with_capacity(num_trajectories);
    for i in 0..num_trajectories {
        let mut state = env.reset(rng);
        let mut trajectory = Trajectory::default();
        for _ in 0..maxlen {
            let action = policy.select_action(values, state, rng)?;
            let record = env.step(action, rng);
            trajectory.push(record);
            if record.done {
                break;
            }
            state = record.next_state;
        }
        debug!(
            "trajectory {}: {} steps, return {:.3}",
            i,
            trajectory.len(),
            trajectory.total_reward()
        );
        trajectories.push(trajectory);
    }
    Ok(Dataset::new(trajectories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdp::QFunction;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Counter that ends the episode once it reaches 3.
    struct Counter {
        state: usize,
    }

    impl Environment for Counter {
        fn num_states(&self) -> usize {
            4
        }

        fn num_actions(&self) -> usize {
            2
        }

        fn reset<R: Rng + ?Sized>(&mut self, _rng: &mut R) -> usize {
            self.state = 0;
            0
        }

        fn step<R: Rng + ?Sized>(&mut self, action: usize, _rng: &mut R) -> TransitionRecord {
            let state = self.state;
            let next_state = (state + action).min(3);
            self.state = next_state;
            TransitionRecord {
                state,
                action,
                next_state,
                reward: 1.0,
                done: next_state == 3,
            }
        }
    }

    #[test]
    fn test_from_states() {
        let t = Trajectory::from_states(&[0, 1, 2], true);
        assert_eq!(t.len(), 2);
        assert_eq!(t.first_state(), Some(0));
        assert!(!t.records()[0].done);
        assert!(t.records()[1].done);
        assert_eq!(t.records()[1].next_state, 2);
    }

    #[test]
    fn test_collect_stops_on_done() {
        let mut env = Counter { state: 0 };
        let mut q = QFunction::zeros(4, 2);
        // Prefer action 1 (advance) everywhere.
        q.q_values.column_mut(1).fill(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let dataset =
            collect_trajectories(&mut env, &Policy::Greedy, &q, 5, 10, &mut rng).unwrap();
        assert_eq!(dataset.len(), 5);
        for t in &dataset {
            assert_eq!(t.len(), 3);
            assert!(t.records()[2].done);
        }
        assert_eq!(dataset.num_records(), 15);
        assert_eq!(dataset.max_trajectory_len(), 3);
    }

    #[test]
    fn test_collect_truncates_at_maxlen() {
        let mut env = Counter { state: 0 };
        // Greedy picks action 0 on ties: the counter never moves.
        let q = QFunction::zeros(4, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let dataset =
            collect_trajectories(&mut env, &Policy::Greedy, &q, 2, 7, &mut rng).unwrap();
        for t in dataset.iter() {
            assert_eq!(t.len(), 7);
            assert!(t.iter().all(|r| !r.done && r.state == 0));
        }
    }
}
