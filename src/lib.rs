//! Maximum-entropy inverse reinforcement learning on tabular MDPs.
//!
//! - [`mdp`]: transition models, value iteration and Q-learning.
//! - [`policy`]: greedy, epsilon-greedy and softmax action selection.
//! - [`dataset`]: demonstrations and their collection.
//! - [`irl`]: visitation estimators and the [`MaxEntIrl`](irl::MaxEntIrl) trainer.
//! - [`gridworld`]: a grid environment to generate demonstrations in.
pub mod dataset;
pub mod error;
pub mod gridworld;
pub mod irl;
pub mod mdp;
pub mod policy;

pub use error::{Error, Result};
pub use irl::{FeatureMatrix, MaxEntIrl, MaxEntIrlConfig};
pub use mdp::{TabularTransition, TransitionModel};
pub use policy::{ActionValues, Policy};
