//! Generation constants: nesting distributions, similarity model, retry bounds.
//!
//! All distribution parameters used by the generator live here so the draw
//! model can be read in one place:
//! - chapters per video ~ round(N(8, 3)) in [3, 19]
//! - turns per chapter ~ round(N(11, 6)) in [4, 40]
//! - chapter length (s) ~ round(N(45, 6)) in [18, 120]

use crate::sampler::BoundedNormal;

/// Chapters per video.
pub const CHAPTER_COUNT: BoundedNormal = BoundedNormal {
    mean: 8.0,
    sd: 3.0,
    min: 3,
    max: 19,
};

/// Turns per chapter.
pub const TURN_COUNT: BoundedNormal = BoundedNormal {
    mean: 11.0,
    sd: 6.0,
    min: 4,
    max: 40,
};

/// Chapter length in seconds.
pub const CHAPTER_LENGTH: BoundedNormal = BoundedNormal {
    mean: 45.0,
    sd: 6.0,
    min: 18,
    max: 120,
};

/// Raw (pre-rescaling) turn length range, seconds.
pub const RAW_TURN_LENGTH_MIN: f64 = 4.0;
pub const RAW_TURN_LENGTH_MAX: f64 = 40.0;

/// Decimal places kept on turn lengths and timeline fields.
pub const TIMING_DECIMALS: i32 = 3;

/// Denominator of the Partner trend weight ((percent - 1) / 180)^2.
pub const PARTNER_TREND_SCALE: f64 = 180.0;

/// Denominator of the Target trend weight ((percent - 1) / 120)^2.
/// Smaller than the Partner scale, so Target similarity approaches 1 faster.
pub const TARGET_TREND_SCALE: f64 = 120.0;

pub const PARTNER_NOISE_SD: f64 = 0.3;
pub const TARGET_NOISE_SD: f64 = 0.1;

/// A raw similarity value with |raw| >= this bound counts as extreme.
pub const SIMILARITY_EXTREME_BOUND: f64 = 0.99;

/// A chapter draw is rejected when the extreme fraction reaches this value.
pub const SIMILARITY_MAX_EXTREME_FRACTION: f64 = 0.05;

/// Default retry bounds for the three acceptance-rejection loops.
pub const DEFAULT_SAMPLER_MAX_ATTEMPTS: u32 = 10_000;
pub const DEFAULT_SIMILARITY_MAX_ATTEMPTS: u32 = 10_000;
pub const DEFAULT_MATRIX_MAX_ATTEMPTS: u32 = 1_000;

/// Default base seed.
pub const DEFAULT_SEED: u64 = 42;

/// Off-diagonal perturbation of the latent correlation matrix ~ N(mean, sd).
pub const LATENT_PERTURB_MEAN: f64 = -0.03;
pub const LATENT_PERTURB_SD: f64 = 0.01;

/// Correlation of each exposed covariate with its latent-block column.
pub const LATENT_BLOCK_CORRELATION: f64 = 0.8;

/// Number of covariates in the latent block.
pub const COVARIATE_COUNT: usize = 10;

/// Smallest eigenvalue accepted when validating a correlation matrix.
pub const PSD_TOLERANCE: f64 = 1e-10;
