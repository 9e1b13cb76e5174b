//! Study registry: the static per-study parameter table.
//!
//! The built-in registry mirrors the coordinated-analysis design: two dyadic
//! interaction studies (one perceiver per recorded conversation) and three
//! shared-stimulus studies (many perceivers rating bundles of the same
//! videos). A registry can also be loaded from a JSON array of
//! [`StudyConfig`] objects.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{GenerationError, Result};
use crate::types::{InferenceSchedule, Paradigm, StudyConfig};

#[derive(Clone, Debug, PartialEq)]
pub struct StudyRegistry {
    studies: Vec<StudyConfig>,
}

impl StudyRegistry {
    /// Validate every study and require unique names.
    pub fn new(studies: Vec<StudyConfig>) -> Result<Self> {
        if studies.is_empty() {
            return Err(GenerationError::config("registry contains no studies"));
        }
        let mut seen = BTreeSet::new();
        for study in &studies {
            study.validate()?;
            if !seen.insert(study.name.as_str()) {
                return Err(GenerationError::config(format!(
                    "duplicate study name '{}'",
                    study.name
                )));
            }
        }
        Ok(Self { studies })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let studies: Vec<StudyConfig> = serde_json::from_str(json)?;
        Self::new(studies)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn studies(&self) -> &[StudyConfig] {
        &self.studies
    }

    pub fn get(&self, name: &str) -> Option<&StudyConfig> {
        self.studies.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.studies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.studies.is_empty()
    }
}

impl Default for StudyRegistry {
    fn default() -> Self {
        Self {
            studies: default_studies(),
        }
    }
}

fn study(
    name: &str,
    targets: u32,
    perceivers: u32,
    videos: u32,
    paradigm: Paradigm,
    schedule: InferenceSchedule,
    videos_per_perceiver: Option<u32>,
) -> StudyConfig {
    StudyConfig {
        name: name.to_string(),
        target_count: targets,
        perceiver_count: perceivers,
        video_count: videos,
        paradigm,
        inference_schedule: schedule,
        videos_per_perceiver,
    }
}

pub fn default_studies() -> Vec<StudyConfig> {
    use InferenceSchedule::*;
    use Paradigm::*;
    vec![
        study("dyad_friends", 48, 48, 48, DyadicInteraction, Variable, None),
        study("dyad_strangers", 60, 60, 60, DyadicInteraction, Variable, None),
        study("stim_autobiographical", 12, 80, 24, SharedStimulus, Fixed, Some(4)),
        study("stim_clinical", 8, 60, 16, SharedStimulus, Fixed, Some(3)),
        study("stim_vlog", 10, 100, 10, SharedStimulus, Variable, Some(2)),
    ]
}
