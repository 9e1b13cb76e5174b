//! Bounded random scalar sampler.
//!
//! Draws `round(N(mean, sd))` and redraws until the value lies in `[min, max]`.
//! The loop is capped at `max_attempts`; exhaustion is a typed error rather
//! than a hang. Parameter combinations with negligible in-range mass are a
//! configuration problem of the caller.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};

/// A normal distribution truncated to an integer interval by rejection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundedNormal {
    pub mean: f64,
    pub sd: f64,
    pub min: i64,
    pub max: i64,
}

impl BoundedNormal {
    pub fn validate(&self) -> Result<()> {
        if !self.mean.is_finite() || !self.sd.is_finite() || self.sd <= 0.0 {
            return Err(GenerationError::config(format!(
                "bounded normal needs finite mean and positive sd (mean={}, sd={})",
                self.mean, self.sd
            )));
        }
        if self.min > self.max {
            return Err(GenerationError::config(format!(
                "bounded normal has min {} > max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Source of bounded integer draws.
///
/// The generator is generic over this trait so tests can pin nesting counts.
pub trait BoundedSampler {
    fn sample_bounded<R: Rng + ?Sized>(&self, rng: &mut R, dist: &BoundedNormal) -> Result<i64>;
}

/// Rejection sampler over a rounded normal draw.
#[derive(Clone, Copy, Debug)]
pub struct RejectionSampler {
    pub max_attempts: u32,
}

impl RejectionSampler {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl BoundedSampler for RejectionSampler {
    fn sample_bounded<R: Rng + ?Sized>(&self, rng: &mut R, dist: &BoundedNormal) -> Result<i64> {
        sample_bounded(rng, dist, self.max_attempts)
    }
}

/// Draw a rounded normal value within `[dist.min, dist.max]`.
pub fn sample_bounded<R: Rng + ?Sized>(
    rng: &mut R,
    dist: &BoundedNormal,
    max_attempts: u32,
) -> Result<i64> {
    dist.validate()?;
    let normal = Normal::new(dist.mean, dist.sd)
        .map_err(|e| GenerationError::config(format!("invalid normal: {e}")))?;
    for _ in 0..max_attempts {
        let value = normal.sample(rng).round();
        if value >= dist.min as f64 && value <= dist.max as f64 {
            return Ok(value as i64);
        }
    }
    Err(GenerationError::NonConvergence {
        stage: "bounded sampler",
        attempts: max_attempts,
    })
}
