//! # turnsim: synthetic multi-study conversation corpus generator
//!
//! Generates a nested behavioral corpus (studies → videos → chapters → turns)
//! with a designed similarity signal and ten covariates whose correlations with
//! that signal and with each other match a target structure. The output is a
//! single in-memory table, one row per turn (per perceiver, for
//! shared-stimulus studies), meant as input to downstream mixed-effects
//! validation.
//!
//! ## Pipeline
//!
//! | Step | Module | Description |
//! |------|--------|-------------|
//! | 0 | [`registry`] | Static per-study parameters (counts, paradigm, inference schedule) |
//! | 1 | [`sampler`] | Bounded rounded-normal draws for nesting counts and chapter length |
//! | 2 | [`hierarchy`] | Expand videos → chapters → turn slots |
//! | 3 | [`turns`] | Timing, position, speaker alternation, similarity acceptance, acts |
//! | 4 | [`participants`] | Dyadic or shared-stimulus target/perceiver/partner ids |
//! | 5 | [`covariates`] | Latent MVN block + conditioned exposed covariates |
//! | 6 | [`orchestrator`] | Drive 1–5 per study, concatenate, build [`corpus::Corpus`] |
//!
//! ## Reproducibility
//!
//! One base seed fans out into independent streams per (stage, study) via
//! [`seeding`]. The same configuration and seed always produce the same table;
//! regenerating a single study reproduces its rows from a full run.
//!
//! ## Bounded retries
//!
//! The three rejection loops (bounded sampler, similarity acceptance,
//! latent-matrix perturbation) are capped by [`config::GeneratorConfig`] and
//! fail with [`error::GenerationError::NonConvergence`] when exhausted.

pub mod config;
pub mod constants;
pub mod corpus;
pub mod covariates;
pub mod env_config;
pub mod error;
pub mod hierarchy;
pub mod orchestrator;
pub mod participants;
pub mod registry;
pub mod sampler;
pub mod seeding;
pub mod statistics;
pub mod storage;
pub mod turns;
pub mod types;

pub use config::GeneratorConfig;
pub use corpus::{Corpus, CorpusRow};
pub use error::{GenerationError, Result};
pub use orchestrator::CorpusGenerator;
pub use registry::StudyRegistry;
