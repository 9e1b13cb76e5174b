//! Summary statistics over a generated corpus.
//!
//! Provides the small numeric helpers the covariate stage needs
//! (mean, sample sd, standardization, Pearson correlation) and the
//! [`CorpusSummary`] report used to check a corpus against its targets:
//! row counts per study, similarity acceptance diagnostics and, per covariate,
//! the empirical correlation with similarity next to the requested target.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::SIMILARITY_EXTREME_BOUND;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::types::ChapterDiagnostics;

/// Mean and sample standard deviation (n - 1 denominator).
pub fn mean_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (mean, (ss / (n - 1) as f64).sqrt())
}

/// Z-scores using the sample sd. Returns `None` when the sd is zero.
pub fn standardize(values: &[f64]) -> Option<Vec<f64>> {
    let (mean, sd) = mean_sd(values);
    if !(sd > 0.0) {
        return None;
    }
    Some(values.iter().map(|v| (v - mean) / sd).collect())
}

/// Pearson correlation. NaN when either input has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len(), "pearson: length mismatch");
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

// ── Report ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CorpusSummary {
    pub seed: u64,
    pub num_rows: usize,
    pub rows_per_study: BTreeMap<String, usize>,
    pub similarity: SimilaritySummary,
    pub covariates: Vec<CovariateSummary>,
    /// Acceptance record of every chapter, in generation order.
    pub chapters: Vec<ChapterDiagnostics>,
}

#[derive(Serialize)]
pub struct SimilaritySummary {
    pub mean: f64,
    pub std_dev: f64,
    pub mean_target_last_decile: f64,
    pub mean_partner_last_decile: f64,
    pub num_chapters: usize,
    pub mean_attempts: f64,
    pub max_attempts: u32,
    pub max_extreme_fraction: f64,
    /// Share of turns whose accepted pre-clamp value had |raw| >= 0.99.
    pub boundary_rate: f64,
}

#[derive(Serialize)]
pub struct CovariateSummary {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub target_corr_with_similarity: f64,
    pub empirical_corr_with_similarity: f64,
}

impl CorpusSummary {
    pub fn from_corpus(corpus: &Corpus) -> Self {
        let mut rows_per_study = BTreeMap::new();
        for row in &corpus.rows {
            *rows_per_study.entry(row.turn.study.clone()).or_insert(0) += 1;
        }

        let similarity: Vec<f64> = corpus.rows.iter().map(|r| r.turn.similarity).collect();
        let (mean, std_dev) = mean_sd(&similarity);

        let last_decile = |speaker: crate::types::Speaker| {
            let vals: Vec<f64> = corpus
                .rows
                .iter()
                .filter(|r| r.turn.speaker == speaker && r.turn.turn_percent_through_chapter > 90.0)
                .map(|r| r.turn.similarity)
                .collect();
            mean_sd(&vals).0
        };

        let diags = &corpus.diagnostics;
        let mean_attempts = if diags.is_empty() {
            0.0
        } else {
            diags.iter().map(|d| d.attempts as f64).sum::<f64>() / diags.len() as f64
        };
        let boundary = corpus
            .rows
            .iter()
            .filter(|r| r.turn.similarity_raw.abs() >= SIMILARITY_EXTREME_BOUND)
            .count();

        let covariates = corpus
            .covariates
            .par_iter()
            .enumerate()
            .map(|(k, spec)| {
                let col = corpus.covariate_column(k);
                let (mean, std_dev) = mean_sd(&col);
                CovariateSummary {
                    name: spec.name.clone(),
                    mean,
                    std_dev,
                    min: col.iter().copied().fold(f64::INFINITY, f64::min),
                    target_corr_with_similarity: spec.target_corr_with_similarity,
                    empirical_corr_with_similarity: pearson(&col, &similarity),
                }
            })
            .collect();

        CorpusSummary {
            seed: corpus.seed,
            num_rows: corpus.rows.len(),
            rows_per_study,
            similarity: SimilaritySummary {
                mean,
                std_dev,
                mean_target_last_decile: last_decile(crate::types::Speaker::Target),
                mean_partner_last_decile: last_decile(crate::types::Speaker::Partner),
                num_chapters: diags.len(),
                mean_attempts,
                max_attempts: diags.iter().map(|d| d.attempts).max().unwrap_or(0),
                max_extreme_fraction: diags
                    .iter()
                    .map(|d| d.extreme_fraction)
                    .fold(0.0, f64::max),
                boundary_rate: if corpus.rows.is_empty() {
                    0.0
                } else {
                    boundary as f64 / corpus.rows.len() as f64
                },
            },
            covariates,
            chapters: corpus.diagnostics.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
