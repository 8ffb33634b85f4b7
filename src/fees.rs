use rand::Rng;

use crate::{
    config::Config,
    error::{validation_error, AppError},
};

/// Gas price suggestion from the recent-price window the caller supplies.
#[derive(Debug, Clone, Copy)]
pub struct FeePredictor {
    default_gwei: f64,
    jitter_gwei: f64,
}

impl FeePredictor {
    pub fn new(default_gwei: f64, jitter_gwei: f64) -> Self {
        Self {
            default_gwei,
            jitter_gwei: jitter_gwei.abs(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fee_default_gwei, config.fee_jitter_gwei)
    }

    /// Mean of `recent_gas` plus uniform jitter, rounded to two decimals.
    /// No history yields the configured default unchanged.
    pub fn predict<R: Rng + ?Sized>(&self, recent_gas: Option<&[f64]>, rng: &mut R) -> Result<f64, AppError> {
        let recent = match recent_gas {
            Some(values) if !values.is_empty() => values,
            _ => return Ok(round2(self.default_gwei)),
        };
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        if !mean.is_finite() {
            return Err(validation_error("recent_gas average is not finite"));
        }
        let jitter = if self.jitter_gwei > 0.0 {
            rng.gen_range(-self.jitter_gwei..=self.jitter_gwei)
        } else {
            0.0
        };
        Ok(round2(mean + jitter))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
