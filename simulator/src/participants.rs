//! Participant identity assignment for both study paradigms.
//!
//! - **Dyadic interaction**: one perceiver per video, every id a pure function
//!   of (study, video index).
//! - **Shared stimulus**: each perceiver draw samples a bundle of distinct
//!   videos without replacement; the bundle's turns are concatenated in draw
//!   order and stamped with the perceiver id. Target and partner ids remain
//!   keyed to the video, so the same video watched twice shares them.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::hierarchy::group_contiguous;
use crate::types::{ParticipantTriple, StudyConfig, TurnRecord};

/// Per-invocation sampling parameters for a shared-stimulus study.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedStimulusParams {
    pub n_perceivers: u32,
    pub n_videos_per_perceiver: u32,
}

impl SharedStimulusParams {
    pub fn validate(&self, study: &StudyConfig) -> Result<()> {
        if self.n_perceivers == 0 {
            return Err(GenerationError::config(format!(
                "study '{}': n_perceivers must be positive",
                study.name
            )));
        }
        if self.n_videos_per_perceiver == 0 {
            return Err(GenerationError::config(format!(
                "study '{}': n_videos_per_perceiver must be positive",
                study.name
            )));
        }
        if self.n_videos_per_perceiver > study.video_count {
            return Err(GenerationError::config(format!(
                "study '{}': cannot sample {} distinct videos per perceiver from {} videos",
                study.name, self.n_videos_per_perceiver, study.video_count
            )));
        }
        Ok(())
    }
}

/// A turn stamped with its participant identities.
#[derive(Clone, Debug, PartialEq)]
pub struct AssignedTurn {
    pub turn: TurnRecord,
    pub participants: ParticipantTriple,
}

pub fn target_id(study: &StudyConfig, video: u32) -> String {
    let target = (video - 1) % study.target_count + 1;
    format!("{}_target_{}", study.name, target)
}

pub fn partner_id(study: &StudyConfig, video: u32) -> String {
    format!("{}_partner_{}", study.name, video)
}

pub fn perceiver_id(study: &StudyConfig, position: u32) -> String {
    format!("{}_perceiver_{}", study.name, position)
}

/// One perceiver per video; identities derived from the video index.
pub fn assign_dyadic(study: &StudyConfig, turns: Vec<TurnRecord>) -> Result<Vec<AssignedTurn>> {
    study.validate()?;
    Ok(turns
        .into_iter()
        .map(|turn| {
            let participants = ParticipantTriple {
                target_id: target_id(study, turn.video),
                perceiver_id: perceiver_id(study, turn.video),
                partner_id: partner_id(study, turn.video),
            };
            AssignedTurn { turn, participants }
        })
        .collect())
}

/// Sample the video bundle for one perceiver draw (0-based positions into `pool`).
pub fn sample_bundle<R: Rng + ?Sized>(rng: &mut R, pool: usize, size: usize) -> Result<Vec<usize>> {
    if size > pool {
        return Err(GenerationError::config(format!(
            "cannot sample {size} distinct videos from a pool of {pool}"
        )));
    }
    Ok(index::sample(rng, pool, size).into_vec())
}

/// Perceiver draws over the study's videos; union of all bundles.
///
/// `turns` must be grouped by video in ascending video order, as produced by
/// the structure stage.
pub fn assign_shared<R: Rng + ?Sized>(
    rng: &mut R,
    study: &StudyConfig,
    params: &SharedStimulusParams,
    turns: &[TurnRecord],
) -> Result<Vec<AssignedTurn>> {
    study.validate()?;
    params.validate(study)?;
    let videos = group_contiguous(turns, |t| t.video);
    if videos.len() != study.video_count as usize {
        return Err(GenerationError::config(format!(
            "study '{}': expected {} videos, structure stage produced {}",
            study.name,
            study.video_count,
            videos.len()
        )));
    }

    let mut out = Vec::new();
    for position in 1..=params.n_perceivers {
        let bundle = sample_bundle(rng, videos.len(), params.n_videos_per_perceiver as usize)?;
        let perceiver = perceiver_id(study, position);
        for v in bundle {
            let video_turns = videos[v];
            let video = video_turns[0].video;
            let target = target_id(study, video);
            let partner = partner_id(study, video);
            out.extend(video_turns.iter().map(|turn| AssignedTurn {
                turn: turn.clone(),
                participants: ParticipantTriple {
                    target_id: target.clone(),
                    perceiver_id: perceiver.clone(),
                    partner_id: partner.clone(),
                },
            }));
        }
    }
    Ok(out)
}
