use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Exponential KL temperature warm-up: `min(exp(rate * step) - 1, max_temp)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KlAnnealing {
    pub rate: f64,
    pub max_temp: f64,
}

impl KlAnnealing {
    pub fn new(rate: f64, max_temp: f64) -> Self {
        KlAnnealing { rate, max_temp }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.kl_anneal_rate, config.max_temp)
    }

    /// Get the temperature for a given iteration
    pub fn get_temp(&self, step: usize) -> f64 {
        kl_temperature(self.rate, step, self.max_temp)
    }
}

pub fn kl_temperature(rate: f64, step: usize, max_temp: f64) -> f64 {
    let temp = (rate * step as f64).exp() - 1.0;
    temp.min(max_temp)
}
