//! Correlated covariate injection.
//!
//! Two stages:
//!
//! 1. **Latent block.** A 10×10 one-factor correlation matrix
//!    (`r_ij = l_i · l_j`) is perturbed off the diagonal by N(−0.03, 0.01),
//!    redrawn until positive definite, and used to draw an n×10
//!    multivariate-normal sample through its Cholesky factor.
//! 2. **Exposed covariates.** Each covariate `y_k` is built from the
//!    standardized similarity `z_s` and the latent column `z_k` with `z_s`
//!    projected out and re-standardized (`z_k⊥`, exactly uncorrelated with
//!    `z_s` in the sample):
//!
//! ```text
//! y_k = a·z_s + b·z_k⊥ + c·e,     e ~ N(0, 1)
//! a = ρ_s,  b = ρ_l,  c² = 1 − ρ_s² − ρ_l²
//! ```
//!
//! so that corr(y_k, s) ≈ ρ_s and corr(y_k, latent_k) ≈ ρ_l = 0.8, then
//! rescaled to the target mean/sd and truncated at 0. Feasibility depends
//! only on the targets, never on the sampled overlap, so small corpora
//! generate as reliably as large ones.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::*;
use crate::error::{GenerationError, Result};
use crate::statistics::{pearson, standardize};

/// Target parameters for one exposed covariate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CovariateSpec {
    pub name: String,
    pub target_mean: f64,
    pub target_sd: f64,
    pub target_corr_with_similarity: f64,
    pub target_corr_with_latent_block: f64,
}

impl CovariateSpec {
    fn new(name: &str, mean: f64, sd: f64, corr_with_similarity: f64) -> Self {
        Self {
            name: name.to_string(),
            target_mean: mean,
            target_sd: sd,
            target_corr_with_similarity: corr_with_similarity,
            target_corr_with_latent_block: LATENT_BLOCK_CORRELATION,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.target_mean.is_finite() || !(self.target_sd > 0.0) {
            return Err(GenerationError::config(format!(
                "covariate '{}': mean must be finite and sd positive",
                self.name
            )));
        }
        for r in [
            self.target_corr_with_similarity,
            self.target_corr_with_latent_block,
        ] {
            if !(-1.0..=1.0).contains(&r) {
                return Err(GenerationError::config(format!(
                    "covariate '{}': correlation {} outside [-1, 1]",
                    self.name, r
                )));
            }
        }
        Ok(())
    }
}

/// The ten language covariates and their hypothesised link to similarity.
pub fn default_covariates() -> Vec<CovariateSpec> {
    vec![
        CovariateSpec::new("word_count", 18.0, 5.0, 0.10),
        CovariateSpec::new("speech_rate", 3.2, 0.8, 0.15),
        CovariateSpec::new("lexical_diversity", 0.72, 0.09, 0.20),
        CovariateSpec::new("pronoun_rate", 12.0, 3.5, 0.25),
        CovariateSpec::new("emotion_word_rate", 4.5, 1.2, 0.30),
        CovariateSpec::new("cognitive_word_rate", 9.0, 2.5, 0.35),
        CovariateSpec::new("hedge_rate", 2.4, 0.6, 0.40),
        CovariateSpec::new("question_rate", 1.6, 0.4, 0.45),
        CovariateSpec::new("concreteness", 2.8, 0.3, 0.50),
        CovariateSpec::new("sentiment", 5.0, 1.2, 0.12),
    ]
}

/// Factor loadings of the latent block (one per covariate).
pub const LATENT_LOADINGS: [f64; COVARIATE_COUNT] =
    [0.55, 0.50, 0.60, 0.45, 0.65, 0.40, 0.50, 0.55, 0.35, 0.60];

/// One-factor correlation matrix: unit diagonal, `l_i · l_j` elsewhere.
pub fn latent_target_matrix(loadings: &[f64]) -> DMatrix<f64> {
    let n = loadings.len();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            loadings[i] * loadings[j]
        }
    })
}

/// Check that `m` is a square, symmetric, unit-diagonal PSD matrix of size `dim`.
pub fn validate_correlation_matrix(m: &DMatrix<f64>, dim: usize) -> Result<()> {
    if m.nrows() != m.ncols() {
        return Err(GenerationError::DimensionMismatch(format!(
            "correlation matrix is {}x{}, not square",
            m.nrows(),
            m.ncols()
        )));
    }
    if m.nrows() != dim {
        return Err(GenerationError::DimensionMismatch(format!(
            "correlation matrix is {0}x{0}, expected {1}x{1}",
            m.nrows(),
            dim
        )));
    }
    for i in 0..dim {
        if (m[(i, i)] - 1.0).abs() > 1e-9 {
            return Err(GenerationError::DimensionMismatch(format!(
                "diagonal entry {} is {}, expected 1",
                i,
                m[(i, i)]
            )));
        }
        for j in (i + 1)..dim {
            if (m[(i, j)] - m[(j, i)]).abs() > 1e-9 {
                return Err(GenerationError::DimensionMismatch(format!(
                    "matrix not symmetric at ({i}, {j})"
                )));
            }
        }
    }
    let min_eigen = SymmetricEigen::new(m.clone()).eigenvalues.min();
    if min_eigen < -PSD_TOLERANCE {
        return Err(GenerationError::DimensionMismatch(format!(
            "matrix not positive semi-definite (min eigenvalue {min_eigen:.3e})"
        )));
    }
    Ok(())
}

/// Perturb every off-diagonal pair by N(−0.03, 0.01), redrawing until the
/// result admits a Cholesky factor. Returns the matrix and its lower factor.
pub fn perturb_correlation<R: Rng + ?Sized>(
    rng: &mut R,
    base: &DMatrix<f64>,
    max_attempts: u32,
) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    let dim = base.nrows();
    validate_correlation_matrix(base, dim)?;
    let noise = Normal::new(LATENT_PERTURB_MEAN, LATENT_PERTURB_SD)
        .map_err(|e| GenerationError::config(format!("invalid perturbation: {e}")))?;

    for attempt in 1..=max_attempts {
        let mut m = base.clone();
        for i in 0..dim {
            for j in (i + 1)..dim {
                let v = (m[(i, j)] + noise.sample(rng)).clamp(-1.0, 1.0);
                m[(i, j)] = v;
                m[(j, i)] = v;
            }
        }
        if let Some(chol) = m.clone().cholesky() {
            debug!(attempt, "latent correlation matrix accepted");
            return Ok((m, chol.l()));
        }
    }
    Err(GenerationError::NonConvergence {
        stage: "correlation matrix perturbation",
        attempts: max_attempts,
    })
}

/// Draw `n` rows of the latent block; returns one column per spec.
pub fn draw_latent_block<R: Rng + ?Sized>(
    rng: &mut R,
    chol_l: &DMatrix<f64>,
    specs: &[CovariateSpec],
    n: usize,
) -> Result<Vec<Vec<f64>>> {
    let dim = chol_l.nrows();
    if chol_l.ncols() != dim || specs.len() != dim {
        return Err(GenerationError::DimensionMismatch(format!(
            "cholesky factor {}x{} does not match {} covariate specs",
            chol_l.nrows(),
            chol_l.ncols(),
            specs.len()
        )));
    }
    let mut columns = vec![Vec::with_capacity(n); dim];
    for _ in 0..n {
        let z = DVector::<f64>::from_fn(dim, |_, _| rng.sample(StandardNormal));
        let x = chol_l * z;
        for (k, spec) in specs.iter().enumerate() {
            columns[k].push(spec.target_mean + spec.target_sd * x[k]);
        }
    }
    Ok(columns)
}

/// Weights (a, b, c) for `y = a·z_s + b·z_l + c·e` hitting both targets.
pub fn conditioning_weights(r: f64, rho_s: f64, rho_l: f64) -> Result<(f64, f64, f64)> {
    let det = 1.0 - r * r;
    if det <= 1e-12 {
        return Err(GenerationError::config(
            "similarity and latent column are collinear; cannot condition on both",
        ));
    }
    let a = (rho_s - r * rho_l) / det;
    let b = (rho_l - r * rho_s) / det;
    let c2 = 1.0 - (a * rho_s + b * rho_l);
    if c2 < 0.0 {
        return Err(GenerationError::config(format!(
            "infeasible correlation targets (similarity {rho_s}, latent {rho_l}, overlap {r:.3})"
        )));
    }
    Ok((a, b, c2.sqrt()))
}

/// Standardize `latent`, remove its projection on `similarity_z` and
/// re-standardize. `None` when nothing but the projection remains.
pub fn orthogonalize(latent: &[f64], similarity_z: &[f64]) -> Option<Vec<f64>> {
    let latent_z = standardize(latent)?;
    let overlap = pearson(similarity_z, &latent_z);
    // Residual variance is 1 - overlap².
    if !overlap.is_finite() || 1.0 - overlap * overlap < 1e-9 {
        return None;
    }
    let residual: Vec<f64> = latent_z
        .iter()
        .zip(similarity_z)
        .map(|(&zl, &zs)| zl - overlap * zs)
        .collect();
    standardize(&residual)
}

/// Generate one exposed covariate conditioned on similarity and its latent column.
pub fn condition_covariate<R: Rng + ?Sized>(
    rng: &mut R,
    similarity_z: &[f64],
    latent: &[f64],
    spec: &CovariateSpec,
) -> Result<Vec<f64>> {
    if similarity_z.len() != latent.len() {
        return Err(GenerationError::DimensionMismatch(format!(
            "similarity has {} rows, latent column '{}' has {}",
            similarity_z.len(),
            spec.name,
            latent.len()
        )));
    }
    let latent_perp = orthogonalize(latent, similarity_z).ok_or_else(|| {
        GenerationError::config(format!(
            "latent column '{}' has no variance left after removing similarity",
            spec.name
        ))
    })?;
    let (a, b, c) = conditioning_weights(
        0.0,
        spec.target_corr_with_similarity,
        spec.target_corr_with_latent_block,
    )?;

    Ok(similarity_z
        .iter()
        .zip(&latent_perp)
        .map(|(&zs, &zl)| {
            let e: f64 = rng.sample(StandardNormal);
            let y = a * zs + b * zl + c * e;
            (spec.target_mean + spec.target_sd * y).max(0.0)
        })
        .collect())
}

/// Result of the covariate stage.
#[derive(Clone, Debug)]
pub struct CovariateBlock {
    pub specs: Vec<CovariateSpec>,
    /// Perturbed latent correlation actually used.
    pub latent_correlation: DMatrix<f64>,
    /// Latent block as drawn, one column per spec.
    pub latent: Vec<Vec<f64>>,
    /// Exposed covariates, one column per spec.
    pub columns: Vec<Vec<f64>>,
}

/// Full injection: perturb, draw the latent block, condition every covariate.
///
/// Draw order: matrix perturbation attempts, then `n` latent rows, then the
/// residual noise of each covariate in spec order.
pub fn inject_covariates<R: Rng + ?Sized>(
    rng: &mut R,
    similarity: &[f64],
    specs: &[CovariateSpec],
    base_correlation: &DMatrix<f64>,
    max_attempts: u32,
) -> Result<CovariateBlock> {
    for spec in specs {
        spec.validate()?;
    }
    if base_correlation.nrows() != specs.len() {
        return Err(GenerationError::DimensionMismatch(format!(
            "{} covariate specs for a {}x{} correlation matrix",
            specs.len(),
            base_correlation.nrows(),
            base_correlation.ncols()
        )));
    }
    let similarity_z = standardize(similarity)
        .ok_or_else(|| GenerationError::config("similarity signal has zero variance"))?;

    let (latent_correlation, chol_l) = perturb_correlation(rng, base_correlation, max_attempts)?;
    let latent = draw_latent_block(rng, &chol_l, specs, similarity.len())?;

    let columns = specs
        .iter()
        .zip(&latent)
        .map(|(spec, col)| condition_covariate(rng, &similarity_z, col, spec))
        .collect::<Result<Vec<_>>>()?;

    Ok(CovariateBlock {
        specs: specs.to_vec(),
        latent_correlation,
        latent,
        columns,
    })
}
