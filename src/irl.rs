//! Maximum-entropy inverse reinforcement learning.
//!
//! [`MaxEntIrl`] alternates a soft backward pass ([`soft_value_iteration`]) with
//! a forward visitation pass ([`expected_visitation`]) and moves the reward
//! weights along `Fᵀ(D_empirical - D_expected)`.
pub mod config;
pub mod features;
pub mod maxent;
pub mod soft_value;
pub mod visitation;


pub use config::MaxEntIrlConfig;
pub use features::FeatureMatrix;
pub use maxent::{IterationStats, MaxEntIrl};
pub use soft_value::{log_sum_exp, soft_value_iteration, SoftPolicy};
pub use visitation::{
    estimate, estimate_with_terminals, expected_visitation, initial_state_distribution,
};
