use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`MaxEntIrl`](super::MaxEntIrl).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaxEntIrlConfig {
    /// Number of outer gradient iterations.
    pub max_iter: usize,

    /// Initial learning rate.
    pub learning_rate: f64,

    /// The learning rate of iteration `t` is `learning_rate * anneal_rate^t`.
    pub anneal_rate: f64,

    /// Discount of the soft backward pass, in `(0, 1]`.
    pub discount: f64,

    /// Convergence threshold of the soft backward pass.
    pub soft_tolerance: f64,

    /// Sweep cap of the soft backward pass.
    pub soft_max_iterations: usize,

    /// Forward-pass horizon, at least 1. Defaults to the longest demonstration.
    pub horizon: Option<usize>,

    /// Fixed start state of the forward pass. Defaults to the empirical
    /// distribution of the demonstrations' first states.
    pub start_state: Option<usize>,

    /// Value every weight starts from.
    pub initial_weight: f64,

    /// Count the state an episode terminates in, both in the demonstrations
    /// and in the forward pass.
    pub count_terminal_arrivals: bool,
}

impl Default for MaxEntIrlConfig {
    fn default() -> Self {
        Self {
            max_iter: 10,
            learning_rate: 1.0,
            anneal_rate: 0.9,
            discount: 0.9,
            soft_tolerance: 1e-6,
            soft_max_iterations: 1000,
            horizon: None,
            start_state: None,
            initial_weight: 0.0,
            count_terminal_arrivals: true,
        }
    }
}

impl MaxEntIrlConfig {
    /// Constructs [`MaxEntIrlConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(rdr)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves [`MaxEntIrlConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the number of outer iterations.
    pub fn max_iter(mut self, v: usize) -> Self {
        self.max_iter = v;
        self
    }

    /// Sets the initial learning rate.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the annealing rate of the learning rate.
    pub fn anneal_rate(mut self, v: f64) -> Self {
        self.anneal_rate = v;
        self
    }

    /// Sets the discount of the soft backward pass.
    pub fn discount(mut self, v: f64) -> Self {
        self.discount = v;
        self
    }

    /// Sets the convergence threshold of the soft backward pass.
    pub fn soft_tolerance(mut self, v: f64) -> Self {
        self.soft_tolerance = v;
        self
    }

    /// Sets the sweep cap of the soft backward pass.
    pub fn soft_max_iterations(mut self, v: usize) -> Self {
        self.soft_max_iterations = v;
        self
    }

    /// Sets the forward-pass horizon.
    pub fn horizon(mut self, v: usize) -> Self {
        self.horizon = Some(v);
        self
    }

    /// Sets a fixed start state for the forward pass.
    pub fn start_state(mut self, v: usize) -> Self {
        self.start_state = Some(v);
        self
    }

    /// Sets the initial weight value.
    pub fn initial_weight(mut self, v: f64) -> Self {
        self.initial_weight = v;
        self
    }

    /// Sets whether terminal states are counted on arrival.
    pub fn count_terminal_arrivals(mut self, v: bool) -> Self {
        self.count_terminal_arrivals = v;
        self
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.anneal_rate > 0.0 && self.anneal_rate <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "anneal_rate must be in (0, 1], got {}",
                self.anneal_rate
            )));
        }
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "discount must be in (0, 1], got {}",
                self.discount
            )));
        }
        if !(self.soft_tolerance > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "soft_tolerance must be positive, got {}",
                self.soft_tolerance
            )));
        }
        if self.soft_max_iterations == 0 {
            return Err(Error::InvalidParameter(
                "soft_max_iterations must be at least 1".to_string(),
            ));
        }
        if self.horizon == Some(0) {
            return Err(Error::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        if !self.initial_weight.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "initial_weight must be finite, got {}",
                self.initial_weight
            )));
        }
        Ok(())
    }
}
