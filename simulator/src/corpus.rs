//! The generated corpus: one flat row per (turn, perceiver) with covariates,
//! plus categorical factors for every text-valued column.
//!
//! Factor levels are the sorted distinct values of a column; codes are
//! 0-based indices into the levels. Column names in [`Corpus::COLUMNS`] are
//! stable and shared by the CSV writer.

use std::collections::{BTreeMap, BTreeSet};

use crate::covariates::CovariateSpec;
use crate::participants::AssignedTurn;
use crate::types::{ChapterDiagnostics, InferenceSchedule, Paradigm, ParticipantTriple, TurnRecord};

/// One output row.
#[derive(Clone, Debug, PartialEq)]
pub struct CorpusRow {
    pub paradigm: Paradigm,
    pub inference_schedule: InferenceSchedule,
    pub turn: TurnRecord,
    pub participants: ParticipantTriple,
    /// Aligned with [`Corpus::covariates`].
    pub covariates: Vec<f64>,
}

impl CorpusRow {
    pub fn from_assigned(
        assigned: AssignedTurn,
        paradigm: Paradigm,
        inference_schedule: InferenceSchedule,
    ) -> Self {
        Self {
            paradigm,
            inference_schedule,
            turn: assigned.turn,
            participants: assigned.participants,
            covariates: Vec::new(),
        }
    }

    /// Value of a text-valued column, `None` for numeric or unknown columns.
    pub fn text_value(&self, column: &str) -> Option<String> {
        let t = &self.turn;
        let p = &self.participants;
        Some(match column {
            "study" => t.study.clone(),
            "paradigm" => self.paradigm.as_str().to_string(),
            "inference_schedule" => self.inference_schedule.as_str().to_string(),
            "video_id" => t.video_id(),
            "chapter_id" => t.chapter_id(),
            "turn_id" => t.turn_id(),
            "target_id" => p.target_id.clone(),
            "perceiver_id" => p.perceiver_id.clone(),
            "partner_id" => p.partner_id.clone(),
            "speaker" => t.speaker.as_str().to_string(),
            "act" => t.act.as_str().to_string(),
            _ => return None,
        })
    }
}

/// Categorical encoding of one text column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Factor {
    pub levels: Vec<String>,
    pub codes: Vec<u32>,
}

impl Factor {
    pub fn from_values(values: &[String]) -> Self {
        let levels: Vec<String> = values
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: BTreeMap<&str, u32> = levels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i as u32))
            .collect();
        let codes = values.iter().map(|v| index[v.as_str()]).collect();
        Self { levels, codes }
    }

    pub fn label(&self, row: usize) -> &str {
        &self.levels[self.codes[row] as usize]
    }
}

/// Complete generated table.
#[derive(Clone, Debug)]
pub struct Corpus {
    pub seed: u64,
    pub rows: Vec<CorpusRow>,
    pub covariates: Vec<CovariateSpec>,
    pub diagnostics: Vec<ChapterDiagnostics>,
    pub factors: BTreeMap<&'static str, Factor>,
}

impl Corpus {
    /// Text-valued columns normalized to factors.
    pub const FACTOR_COLUMNS: [&'static str; 11] = [
        "study",
        "paradigm",
        "inference_schedule",
        "video_id",
        "chapter_id",
        "turn_id",
        "target_id",
        "perceiver_id",
        "partner_id",
        "speaker",
        "act",
    ];

    /// Fixed columns in output order; covariate columns follow.
    pub const COLUMNS: [&'static str; 24] = [
        "study",
        "paradigm",
        "inference_schedule",
        "video_id",
        "chapter_id",
        "turn_id",
        "target_id",
        "perceiver_id",
        "partner_id",
        "video",
        "chapter",
        "turn",
        "turn_count",
        "chapter_length",
        "turn_length",
        "start_time",
        "end_time",
        "turns_from_inference",
        "turn_percent_through_chapter",
        "time_percent_through_chapter",
        "speaker",
        "similarity",
        "act",
        "similarity_raw",
    ];

    pub fn new(
        seed: u64,
        rows: Vec<CorpusRow>,
        covariates: Vec<CovariateSpec>,
        diagnostics: Vec<ChapterDiagnostics>,
    ) -> Self {
        let factors = Self::FACTOR_COLUMNS
            .iter()
            .map(|&col| {
                let values: Vec<String> = rows
                    .iter()
                    .map(|r| r.text_value(col).unwrap_or_default())
                    .collect();
                (col, Factor::from_values(&values))
            })
            .collect();
        Self {
            seed,
            rows,
            covariates,
            diagnostics,
            factors,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn factor(&self, column: &str) -> Option<&Factor> {
        self.factors.get(column)
    }

    pub fn covariate_names(&self) -> Vec<&str> {
        self.covariates.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn covariate_column(&self, k: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r.covariates[k]).collect()
    }

    pub fn similarity(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.turn.similarity).collect()
    }

    /// Rows belonging to one study, in generation order.
    pub fn study_rows<'a>(&'a self, study: &'a str) -> impl Iterator<Item = &'a CorpusRow> + 'a {
        self.rows.iter().filter(move |r| r.turn.study == study)
    }
}
