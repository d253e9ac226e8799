//! A rectangular grid world with absorbing goal cells.
//!
//! States are numbered row-major, `s = row * width + col`. Actions are
//! [`Action::Up`], [`Action::Down`], [`Action::Left`] and [`Action::Right`].
//! Reward is paid for leaving a cell, and entering a goal cell ends the
//! episode.

use crate::dataset::{Environment, TransitionRecord};
use crate::error::{Error, Result};
use crate::irl::FeatureMatrix;
use crate::mdp::{TabularTransition, TransitionModel, TransitionSampler};
use ndarray::{Array1, Array2, Array3, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Grid moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Row - 1.
    Up = 0,
    /// Row + 1.
    Down = 1,
    /// Column - 1.
    Left = 2,
    /// Column + 1.
    Right = 3,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }
}

/// Layout and dynamics of a [`GridWorld`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridWorldConfig {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Starting cell as `(row, col)`.
    pub init_pos: (usize, usize),
    /// Goal cells as `(row, col)`.
    pub goal_pos: Vec<(usize, usize)>,
    /// Probability that the intended move happens. The rest is spread evenly
    /// over the other moves.
    pub action_success_rate: f64,
}

impl GridWorldConfig {
    /// A `width x height` grid starting in the top-left corner with the goal
    /// in the bottom-right corner and deterministic moves.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            init_pos: (0, 0),
            goal_pos: vec![(height.saturating_sub(1), width.saturating_sub(1))],
            action_success_rate: 1.0,
        }
    }

    /// Sets the starting cell.
    pub fn init_pos(mut self, pos: (usize, usize)) -> Self {
        self.init_pos = pos;
        self
    }

    /// Sets the goal cells.
    pub fn goal_pos(mut self, goals: Vec<(usize, usize)>) -> Self {
        self.goal_pos = goals;
        self
    }

    /// Sets the probability that a move succeeds.
    pub fn action_success_rate(mut self, v: f64) -> Self {
        self.action_success_rate = v;
        self
    }
}

/// Grid world environment.
#[derive(Debug, Clone)]
pub struct GridWorld {
    config: GridWorldConfig,
    transition: TabularTransition,
    reward: Array1<f64>,
    goal_states: Vec<usize>,
    is_goal: Vec<bool>,
    state: usize,
}

impl GridWorld {
    /// Builds the environment from its layout and a `height x width` reward grid.
    pub fn new(config: GridWorldConfig, reward_grid: &Array2<f64>) -> Result<Self> {
        let (w, h) = (config.width, config.height);
        if w == 0 || h == 0 {
            return Err(Error::InvalidParameter("grid must not be empty".to_string()));
        }
        if reward_grid.dim() != (h, w) {
            return Err(Error::dimension(
                "reward grid",
                h * w,
                reward_grid.len(),
            ));
        }
        if !(0.0..=1.0).contains(&config.action_success_rate) {
            return Err(Error::InvalidParameter(format!(
                "action_success_rate must be in [0, 1], got {}",
                config.action_success_rate
            )));
        }
        check_pos(config.init_pos, h, w, "init_pos")?;
        let mut goal_states = Vec::with_capacity(config.goal_pos.len());
        for &pos in &config.goal_pos {
            check_pos(pos, h, w, "goal_pos")?;
            goal_states.push(pos.0 * w + pos.1);
        }
        goal_states.sort_unstable();
        goal_states.dedup();

        let n_s = w * h;
        let n_a = Action::ALL.len();
        let mut is_goal = vec![false; n_s];
        for &g in &goal_states {
            is_goal[g] = true;
        }

        let slip = if n_a > 1 {
            (1.0 - config.action_success_rate) / (n_a - 1) as f64
        } else {
            0.0
        };
        let mut table = Array3::zeros((n_s, n_a, n_s));
        for s in 0..n_s {
            for (a, &intended) in Action::ALL.iter().enumerate() {
                if is_goal[s] {
                    table[[s, a, s]] = 1.0;
                    continue;
                }
                for &actual in Action::ALL.iter() {
                    let p = if actual == intended {
                        config.action_success_rate
                    } else {
                        slip
                    };
                    if p > 0.0 {
                        table[[s, a, move_from(s, actual, h, w)]] += p;
                    }
                }
            }
        }
        let transition = TabularTransition::new(table)?;
        let reward = Array1::from_iter(reward_grid.iter().copied());
        let state = config.init_pos.0 * w + config.init_pos.1;

        Ok(Self {
            config,
            transition,
            reward,
            goal_states,
            is_goal,
            state,
        })
    }

    /// Layout of the grid.
    pub fn config(&self) -> &GridWorldConfig {
        &self.config
    }

    /// Transition table of the grid.
    pub fn transition(&self) -> &TabularTransition {
        &self.transition
    }

    /// Ground-truth reward, one entry per state.
    pub fn reward(&self) -> &Array1<f64> {
        &self.reward
    }

    /// Goal states in increasing order.
    pub fn goal_states(&self) -> &[usize] {
        &self.goal_states
    }

    /// Whether `state` is a goal.
    pub fn is_goal(&self, state: usize) -> bool {
        self.is_goal[state]
    }

    /// State index of `(row, col)`.
    pub fn state_of(&self, pos: (usize, usize)) -> usize {
        pos.0 * self.config.width + pos.1
    }

    /// `(row, col)` of a state index.
    pub fn position_of(&self, state: usize) -> (usize, usize) {
        (state / self.config.width, state % self.config.width)
    }

    /// One-hot features: state `s` has a single 1 in column `s`.
    pub fn feature_matrix(&self) -> FeatureMatrix {
        FeatureMatrix::identity(self.transition.num_states())
    }

    /// Reshapes a per-state vector into a `height x width` grid.
    pub fn to_grid(&self, values: ArrayView1<'_, f64>) -> Result<Array2<f64>> {
        let (h, w) = (self.config.height, self.config.width);
        if values.len() != h * w {
            return Err(Error::dimension("grid vector", h * w, values.len()));
        }
        Ok(Array2::from_shape_fn((h, w), |(r, c)| values[r * w + c]))
    }
}

impl Environment for GridWorld {
    fn num_states(&self) -> usize {
        self.transition.num_states()
    }

    fn num_actions(&self) -> usize {
        self.transition.num_actions()
    }

    fn reset<R: Rng + ?Sized>(&mut self, _rng: &mut R) -> usize {
        self.state = self.state_of(self.config.init_pos);
        self.state
    }

    fn step<R: Rng + ?Sized>(&mut self, action: usize, rng: &mut R) -> TransitionRecord {
        let state = self.state;
        let next_state = self.transition.sample_next(state, action, rng);
        self.state = next_state;
        TransitionRecord {
            state,
            action,
            next_state,
            reward: self.reward[state],
            done: self.is_goal[next_state],
        }
    }
}

/// Sets the reward of every goal cell to `value`.
pub fn construct_goal_reward(grid: &mut Array2<f64>, goals: &[(usize, usize)], value: f64) {
    for &pos in goals {
        if let Some(cell) = grid.get_mut(pos) {
            *cell = value;
        }
    }
}

/// Adds `value` to every cell within Euclidean distance `radius` of a center.
pub fn construct_radius_reward(
    grid: &mut Array2<f64>,
    centers: &[(usize, usize)],
    radius: f64,
    value: f64,
) {
    for ((r, c), cell) in grid.indexed_iter_mut() {
        let inside = centers.iter().any(|&(cr, cc)| {
            let dr = r as f64 - cr as f64;
            let dc = c as f64 - cc as f64;
            (dr * dr + dc * dc).sqrt() <= radius
        });
        if inside {
            *cell += value;
        }
    }
}

fn check_pos(pos: (usize, usize), h: usize, w: usize, what: &str) -> Result<()> {
    if pos.0 >= h {
        return Err(Error::dimension(format!("{} row", what), h, pos.0));
    }
    if pos.1 >= w {
        return Err(Error::dimension(format!("{} column", what), w, pos.1));
    }
    Ok(())
}

fn move_from(state: usize, action: Action, h: usize, w: usize) -> usize {
    let (row, col) = ((state / w) as isize, (state % w) as isize);
    let (dr, dc) = action.delta();
    let (nr, nc) = (row + dr, col + dc);
    if nr < 0 || nc < 0 || nr >= h as isize || nc >= w as isize {
        state
    } else {
        nr as usize * w + nc as usize
    }
}
