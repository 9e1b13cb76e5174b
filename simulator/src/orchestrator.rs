//! Study orchestration: structure, identities and covariates for a whole registry.
//!
//! Stage order and draw order are fixed:
//!
//! | Stage | Stream | Draws |
//! |-------|--------|-------|
//! | Structure | per study | chapter counts (video order), turn counts (chapter order), then per chapter: length, turn lengths, speaker order, similarity attempts, acts |
//! | Participants | per study | shared-stimulus bundles, one per perceiver draw |
//! | Covariates | corpus-wide | latent matrix perturbation, latent rows, residual noise per covariate |
//!
//! Studies never share a stream, so regenerating one study with
//! [`CorpusGenerator::generate_study`] reproduces its rows from a full run.

use rand::Rng;
use tracing::info;

use crate::config::GeneratorConfig;
use crate::constants::{CHAPTER_COUNT, TURN_COUNT};
use crate::corpus::{Corpus, CorpusRow};
use crate::covariates::{inject_covariates, latent_target_matrix};
use crate::error::{GenerationError, Result};
use crate::hierarchy::{expand, group_contiguous};
use crate::participants::{assign_dyadic, assign_shared, SharedStimulusParams};
use crate::registry::StudyRegistry;
use crate::sampler::{BoundedNormal, BoundedSampler, RejectionSampler};
use crate::seeding::{stage_rng, Stage};
use crate::turns::synthesize_chapter;
use crate::types::{ChapterDiagnostics, ChapterRow, Paradigm, StudyConfig, TurnRecord, VideoRow};

/// Turns of one study before identities are attached.
#[derive(Clone, Debug, PartialEq)]
pub struct StudyStructure {
    pub turns: Vec<TurnRecord>,
    pub diagnostics: Vec<ChapterDiagnostics>,
}

/// Rows of one study with identities, before covariates.
#[derive(Clone, Debug, PartialEq)]
pub struct StudyTable {
    pub rows: Vec<CorpusRow>,
    pub diagnostics: Vec<ChapterDiagnostics>,
}

fn sample_count<S: BoundedSampler, R: Rng + ?Sized>(
    sampler: &S,
    rng: &mut R,
    dist: &BoundedNormal,
) -> Result<u32> {
    let v = sampler.sample_bounded(rng, dist)?;
    u32::try_from(v)
        .map_err(|_| GenerationError::config(format!("sampled count {v} is not a valid count")))
}

/// Resolve shared-stimulus parameters: invocation override, then registry.
pub fn resolve_shared_params(
    study: &StudyConfig,
    config: &GeneratorConfig,
) -> Result<SharedStimulusParams> {
    let params = match config.shared_stimulus.get(&study.name) {
        Some(p) => *p,
        None => {
            let per = study.videos_per_perceiver.ok_or_else(|| {
                GenerationError::config(format!(
                    "shared-stimulus study '{}' has no videos_per_perceiver",
                    study.name
                ))
            })?;
            SharedStimulusParams {
                n_perceivers: study.perceiver_count,
                n_videos_per_perceiver: per,
            }
        }
    };
    params.validate(study)?;
    Ok(params)
}

pub struct CorpusGenerator<S: BoundedSampler = RejectionSampler> {
    config: GeneratorConfig,
    sampler: S,
}

impl CorpusGenerator<RejectionSampler> {
    pub fn new(config: GeneratorConfig) -> Self {
        let sampler = RejectionSampler::new(config.sampler_max_attempts);
        Self { config, sampler }
    }
}

impl<S: BoundedSampler> CorpusGenerator<S> {
    /// Use a custom count sampler (e.g. a stub pinning nesting counts).
    pub fn with_sampler(config: GeneratorConfig, sampler: S) -> Self {
        Self { config, sampler }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Videos → chapters → turns for one study.
    pub fn generate_structure(&self, study: &StudyConfig) -> Result<StudyStructure> {
        study.validate()?;
        let mut rng = stage_rng(self.config.seed, Stage::Structure, Some(study.name.as_str()));

        let videos = (1..=study.video_count)
            .map(|video| -> Result<VideoRow> {
                Ok(VideoRow {
                    study: study.name.clone(),
                    video,
                    chapter_count: sample_count(&self.sampler, &mut rng, &CHAPTER_COUNT)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let chapters = expand(&videos, |v| v.chapter_count)
            .into_iter()
            .map(|(v, chapter)| -> Result<ChapterRow> {
                Ok(ChapterRow {
                    study: v.study,
                    video: v.video,
                    chapter,
                    turn_count: sample_count(&self.sampler, &mut rng, &TURN_COUNT)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let slots = expand(&chapters, |c| c.turn_count);
        let mut turns = Vec::with_capacity(slots.len());
        let mut diagnostics = Vec::with_capacity(chapters.len());
        for group in group_contiguous(&slots, |(c, _)| c.key()) {
            let chapter = &group[0].0;
            let indices: Vec<u32> = group.iter().map(|(_, t)| *t).collect();
            let (chapter_turns, diag) = synthesize_chapter(
                &mut rng,
                &self.sampler,
                chapter,
                &indices,
                self.config.similarity_max_attempts,
            )?;
            turns.extend(chapter_turns);
            diagnostics.push(diag);
        }

        Ok(StudyStructure { turns, diagnostics })
    }

    /// Structure plus participant identities for one study.
    pub fn generate_study(&self, study: &StudyConfig) -> Result<StudyTable> {
        let shared = match study.paradigm {
            Paradigm::SharedStimulus => Some(resolve_shared_params(study, &self.config)?),
            Paradigm::DyadicInteraction => None,
        };

        let structure = self.generate_structure(study)?;
        let assigned = match shared {
            Some(params) => {
                let mut rng = stage_rng(
                    self.config.seed,
                    Stage::Participants,
                    Some(study.name.as_str()),
                );
                assign_shared(&mut rng, study, &params, &structure.turns)?
            }
            None => assign_dyadic(study, structure.turns)?,
        };

        let rows: Vec<CorpusRow> = assigned
            .into_iter()
            .map(|a| CorpusRow::from_assigned(a, study.paradigm, study.inference_schedule))
            .collect();
        info!(
            study = %study.name,
            paradigm = study.paradigm.as_str(),
            chapters = structure.diagnostics.len(),
            rows = rows.len(),
            "study generated"
        );
        Ok(StudyTable {
            rows,
            diagnostics: structure.diagnostics,
        })
    }

    /// Generate every study in the registry, then inject covariates corpus-wide.
    pub fn generate(&self, registry: &StudyRegistry) -> Result<Corpus> {
        self.generate_from(registry.studies())
    }

    /// Generate the given studies (in order) into one corpus.
    pub fn generate_from(&self, studies: &[StudyConfig]) -> Result<Corpus> {
        let mut rows = Vec::new();
        let mut diagnostics = Vec::new();
        for study in studies {
            let table = self.generate_study(study)?;
            rows.extend(table.rows);
            diagnostics.extend(table.diagnostics);
        }
        self.finish(rows, diagnostics)
    }

    fn finish(
        &self,
        mut rows: Vec<CorpusRow>,
        diagnostics: Vec<ChapterDiagnostics>,
    ) -> Result<Corpus> {
        let similarity: Vec<f64> = rows.iter().map(|r| r.turn.similarity).collect();
        let base = latent_target_matrix(&self.config.latent_loadings);
        let mut rng = stage_rng(self.config.seed, Stage::Covariates, None);
        let block = inject_covariates(
            &mut rng,
            &similarity,
            &self.config.covariates,
            &base,
            self.config.matrix_max_attempts,
        )?;

        for (i, row) in rows.iter_mut().enumerate() {
            row.covariates = block.columns.iter().map(|col| col[i]).collect();
        }
        info!(
            rows = rows.len(),
            covariates = block.specs.len(),
            "covariates injected"
        );
        Ok(Corpus::new(self.config.seed, rows, block.specs, diagnostics))
    }
}
