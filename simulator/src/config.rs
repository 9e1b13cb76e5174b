//! Generator configuration.
//!
//! Every field has a default, so a JSON config only needs the fields it
//! changes. `TURNSIM_SEED` overrides the seed after loading (see
//! [`crate::env_config`]).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::covariates::{default_covariates, CovariateSpec, LATENT_LOADINGS};
use crate::error::Result;
use crate::participants::SharedStimulusParams;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base seed; every stage derives its own stream from it.
    pub seed: u64,
    pub sampler_max_attempts: u32,
    pub similarity_max_attempts: u32,
    pub matrix_max_attempts: u32,
    /// Per-study shared-stimulus overrides, keyed by study name.
    pub shared_stimulus: BTreeMap<String, SharedStimulusParams>,
    pub covariates: Vec<CovariateSpec>,
    /// One-factor loadings of the latent block, one per covariate.
    pub latent_loadings: Vec<f64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            sampler_max_attempts: DEFAULT_SAMPLER_MAX_ATTEMPTS,
            similarity_max_attempts: DEFAULT_SIMILARITY_MAX_ATTEMPTS,
            matrix_max_attempts: DEFAULT_MATRIX_MAX_ATTEMPTS,
            shared_stimulus: BTreeMap::new(),
            covariates: default_covariates(),
            latent_loadings: LATENT_LOADINGS.to_vec(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shared_stimulus(mut self, study: &str, params: SharedStimulusParams) -> Self {
        self.shared_stimulus.insert(study.to_string(), params);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = GeneratorConfig::from_json_str(
            r#"{"seed": 7, "shared_stimulus": {"stim_vlog": {"n_perceivers": 5, "n_videos_per_perceiver": 2}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.similarity_max_attempts, DEFAULT_SIMILARITY_MAX_ATTEMPTS);
        assert_eq!(cfg.covariates.len(), COVARIATE_COUNT);
        assert_eq!(cfg.shared_stimulus["stim_vlog"].n_perceivers, 5);
    }

    #[test]
    fn test_builders() {
        let params = SharedStimulusParams {
            n_perceivers: 3,
            n_videos_per_perceiver: 1,
        };
        let cfg = GeneratorConfig::default()
            .with_seed(9)
            .with_shared_stimulus("s", params);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.shared_stimulus.get("s"), Some(&params));
    }
}
