//! Core data types: study configuration, hierarchy rows and the per-turn record.
//!
//! Rows flow through the pipeline in this order:
//! [`VideoRow`] → [`ChapterRow`] → [`TurnRecord`] → [`crate::corpus::CorpusRow`].
//! Every row carries its study name so identifiers can be built without
//! reaching back into the registry.

use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Paradigm {
    /// Many perceivers rate the same recorded stimulus videos.
    SharedStimulus,
    /// One perceiver per live interaction.
    DyadicInteraction,
}

impl Paradigm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Paradigm::SharedStimulus => "shared_stimulus",
            Paradigm::DyadicInteraction => "dyadic_interaction",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InferenceSchedule {
    Fixed,
    Variable,
}

impl InferenceSchedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceSchedule::Fixed => "fixed",
            InferenceSchedule::Variable => "variable",
        }
    }
}

/// Static per-study parameters from the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub name: String,
    pub target_count: u32,
    pub perceiver_count: u32,
    pub video_count: u32,
    pub paradigm: Paradigm,
    pub inference_schedule: InferenceSchedule,
    /// Default bundle size for shared-stimulus studies.
    #[serde(default)]
    pub videos_per_perceiver: Option<u32>,
}

impl StudyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GenerationError::config("study name must not be empty"));
        }
        if self.target_count == 0 || self.perceiver_count == 0 || self.video_count == 0 {
            return Err(GenerationError::config(format!(
                "study '{}': target, perceiver and video counts must be positive",
                self.name
            )));
        }
        if self.paradigm == Paradigm::DyadicInteraction && self.perceiver_count != self.video_count
        {
            return Err(GenerationError::config(format!(
                "study '{}': dyadic studies need one perceiver per video ({} perceivers, {} videos)",
                self.name, self.perceiver_count, self.video_count
            )));
        }
        Ok(())
    }

    pub fn video_id(&self, video: u32) -> String {
        format!("{}_v{}", self.name, video)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Target,
    Partner,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Target => "target",
            Speaker::Partner => "partner",
        }
    }

    pub fn other(self) -> Speaker {
        match self {
            Speaker::Target => Speaker::Partner,
            Speaker::Partner => Speaker::Target,
        }
    }
}

/// Conversational-act vocabulary. Labels are drawn uniformly per turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogueAct {
    Statement,
    Opinion,
    Question,
    Answer,
    Backchannel,
    Agreement,
    Hedge,
    Other,
}

impl DialogueAct {
    pub const ALL: [DialogueAct; 8] = [
        DialogueAct::Statement,
        DialogueAct::Opinion,
        DialogueAct::Question,
        DialogueAct::Answer,
        DialogueAct::Backchannel,
        DialogueAct::Agreement,
        DialogueAct::Hedge,
        DialogueAct::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueAct::Statement => "statement",
            DialogueAct::Opinion => "opinion",
            DialogueAct::Question => "question",
            DialogueAct::Answer => "answer",
            DialogueAct::Backchannel => "backchannel",
            DialogueAct::Agreement => "agreement",
            DialogueAct::Hedge => "hedge",
            DialogueAct::Other => "other",
        }
    }
}

/// One video with its sampled chapter count.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoRow {
    pub study: String,
    pub video: u32,
    pub chapter_count: u32,
}

/// One chapter with its sampled turn count.
#[derive(Clone, Debug, PartialEq)]
pub struct ChapterRow {
    pub study: String,
    pub video: u32,
    pub chapter: u32,
    pub turn_count: u32,
}

impl ChapterRow {
    /// Grouping key: (video, chapter) within a study.
    pub fn key(&self) -> (u32, u32) {
        (self.video, self.chapter)
    }

    pub fn chapter_id(&self) -> String {
        format!("{}_v{}_c{}", self.study, self.video, self.chapter)
    }
}

/// Fully synthesized turn, before participant identities and covariates.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnRecord {
    pub study: String,
    pub video: u32,
    pub chapter: u32,
    /// 1-indexed position within the chapter.
    pub turn: u32,
    pub turn_count: u32,
    pub chapter_length: f64,
    pub turn_length: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub turns_from_inference: u32,
    pub turn_percent_through_chapter: f64,
    pub time_percent_through_chapter: f64,
    pub speaker: Speaker,
    /// Clamped to [-1, 1].
    pub similarity: f64,
    /// Accepted draw before clamping.
    pub similarity_raw: f64,
    pub act: DialogueAct,
}

impl TurnRecord {
    pub fn video_id(&self) -> String {
        format!("{}_v{}", self.study, self.video)
    }

    pub fn chapter_id(&self) -> String {
        format!("{}_v{}_c{}", self.study, self.video, self.chapter)
    }

    pub fn turn_id(&self) -> String {
        format!("{}_v{}_c{}_t{}", self.study, self.video, self.chapter, self.turn)
    }
}

/// Identities attached to a turn row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParticipantTriple {
    pub target_id: String,
    pub perceiver_id: String,
    pub partner_id: String,
}

/// Per-chapter acceptance bookkeeping from the similarity loop.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChapterDiagnostics {
    pub study: String,
    pub video: u32,
    pub chapter: u32,
    pub attempts: u32,
    pub extreme_fraction: f64,
}
