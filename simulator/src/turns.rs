//! Turn-feature synthesis: timing, position, speaker, similarity and act per chapter.
//!
//! Each chapter is processed as one pure transform over its turn slots. Draw
//! order inside a chapter is fixed:
//!
//! 1. chapter length (bounded sampler)
//! 2. `n` raw turn lengths ~ U[4, 40]
//! 3. speaker order (one Bernoulli draw)
//! 4. similarity attempts, each drawing `n` uniforms then `n` normals
//! 5. `n` act labels
//!
//! ## Similarity model
//!
//! For a turn at `percent` through its chapter:
//!
//! ```text
//! weight = ((percent - 1) / scale)^2      scale = 120 (Target), 180 (Partner)
//! raw    = base * (1 - weight) + weight + noise
//! base   ~ U[-1, 1]
//! noise  ~ N(0, 0.1) (Target), N(0, 0.3) (Partner)
//! ```
//!
//! The whole chapter is redrawn while 5% or more of its raw values satisfy
//! `|raw| >= 0.99`. The accepted values are clamped to [-1, 1].

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, warn};

use crate::constants::*;
use crate::error::{GenerationError, Result};
use crate::sampler::BoundedSampler;
use crate::types::{ChapterDiagnostics, ChapterRow, DialogueAct, Speaker, TurnRecord};

/// Round to the timing precision (3 decimal places).
#[inline]
pub fn round_timing(x: f64) -> f64 {
    let scale = 10f64.powi(TIMING_DECIMALS);
    (x * scale).round() / scale
}

/// Contiguous timeline of one chapter.
#[derive(Clone, Debug, PartialEq)]
pub struct ChapterTimeline {
    pub lengths: Vec<f64>,
    pub starts: Vec<f64>,
    pub ends: Vec<f64>,
}

/// Draw `n` raw lengths, rescale them to `chapter_length` and round.
pub fn allocate_turn_lengths<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    chapter_length: f64,
) -> Vec<f64> {
    let raw: Vec<f64> = (0..n)
        .map(|_| rng.random_range(RAW_TURN_LENGTH_MIN..=RAW_TURN_LENGTH_MAX))
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter()
        .map(|r| round_timing(r / total * chapter_length))
        .collect()
}

/// Cumulative start/end times. `starts[0] = 0`, `starts[i] = ends[i - 1]`.
pub fn build_timeline(lengths: Vec<f64>) -> ChapterTimeline {
    let mut starts = Vec::with_capacity(lengths.len());
    let mut ends = Vec::with_capacity(lengths.len());
    let mut acc = 0.0f64;
    for &len in &lengths {
        starts.push(acc);
        acc = round_timing(acc + len);
        ends.push(acc);
    }
    ChapterTimeline {
        lengths,
        starts,
        ends,
    }
}

/// Position-based percent for a 1-indexed turn.
#[inline]
pub fn turn_percent(index: u32, turn_count: u32) -> f64 {
    index as f64 / turn_count as f64 * 100.0
}

/// Alternating speaker sequence, starting speaker chosen uniformly.
pub fn speaker_sequence<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<Speaker> {
    let first = if rng.random_bool(0.5) {
        Speaker::Target
    } else {
        Speaker::Partner
    };
    let order = [first, first.other()];
    order.iter().copied().cycle().take(n).collect()
}

/// Trend weight pulling similarity toward 1.
#[inline]
pub fn trend_weight(speaker: Speaker, percent: f64) -> f64 {
    let scale = match speaker {
        Speaker::Target => TARGET_TREND_SCALE,
        Speaker::Partner => PARTNER_TREND_SCALE,
    };
    ((percent - 1.0) / scale).powi(2)
}

/// Fraction of values with `|v| >= 0.99`.
pub fn extreme_fraction(raw: &[f64]) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }
    let extreme = raw
        .iter()
        .filter(|v| v.abs() >= SIMILARITY_EXTREME_BOUND)
        .count();
    extreme as f64 / raw.len() as f64
}

/// Accepted similarity draw for one chapter.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityDraw {
    pub raw: Vec<f64>,
    pub clamped: Vec<f64>,
    pub attempts: u32,
    pub extreme_fraction: f64,
}

/// Acceptance-rejection simulation of the chapter's similarity signal.
pub fn simulate_similarity<R: Rng + ?Sized>(
    rng: &mut R,
    speakers: &[Speaker],
    percents: &[f64],
    max_attempts: u32,
) -> Result<SimilarityDraw> {
    debug_assert_eq!(speakers.len(), percents.len());
    let n = speakers.len();
    let target_noise = Normal::new(0.0, TARGET_NOISE_SD)
        .map_err(|e| GenerationError::config(format!("invalid noise: {e}")))?;
    let partner_noise = Normal::new(0.0, PARTNER_NOISE_SD)
        .map_err(|e| GenerationError::config(format!("invalid noise: {e}")))?;

    for attempt in 1..=max_attempts {
        let base: Vec<f64> = (0..n).map(|_| rng.random_range(-1.0..=1.0)).collect();
        let noise: Vec<f64> = speakers
            .iter()
            .map(|s| match s {
                Speaker::Target => target_noise.sample(rng),
                Speaker::Partner => partner_noise.sample(rng),
            })
            .collect();

        let raw: Vec<f64> = (0..n)
            .map(|i| {
                let w = trend_weight(speakers[i], percents[i]);
                base[i] * (1.0 - w) + w + noise[i]
            })
            .collect();

        let fraction = extreme_fraction(&raw);
        if fraction < SIMILARITY_MAX_EXTREME_FRACTION {
            let clamped = raw.iter().map(|v| v.clamp(-1.0, 1.0)).collect();
            return Ok(SimilarityDraw {
                raw,
                clamped,
                attempts: attempt,
                extreme_fraction: fraction,
            });
        }
    }
    Err(GenerationError::NonConvergence {
        stage: "similarity acceptance",
        attempts: max_attempts,
    })
}

/// Synthesize every turn of one chapter from its slots.
///
/// `slots` are the turn indices 1..=turn_count produced by the expander.
pub fn synthesize_chapter<R, S>(
    rng: &mut R,
    sampler: &S,
    chapter: &ChapterRow,
    slots: &[u32],
    similarity_max_attempts: u32,
) -> Result<(Vec<TurnRecord>, ChapterDiagnostics)>
where
    R: Rng + ?Sized,
    S: BoundedSampler,
{
    let n = slots.len();
    if n == 0 || n as u32 != chapter.turn_count {
        return Err(GenerationError::config(format!(
            "chapter {} has {} slots for turn_count {}",
            chapter.chapter_id(),
            n,
            chapter.turn_count
        )));
    }

    let chapter_length = sampler.sample_bounded(rng, &CHAPTER_LENGTH)? as f64;
    let timeline = build_timeline(allocate_turn_lengths(rng, n, chapter_length));
    let speakers = speaker_sequence(rng, n);
    let percents: Vec<f64> = slots
        .iter()
        .map(|&t| turn_percent(t, chapter.turn_count))
        .collect();

    let draw = simulate_similarity(rng, &speakers, &percents, similarity_max_attempts)?;
    if draw.attempts > similarity_max_attempts / 2 {
        warn!(
            chapter = %chapter.chapter_id(),
            attempts = draw.attempts,
            "similarity acceptance slow to converge"
        );
    } else {
        debug!(chapter = %chapter.chapter_id(), attempts = draw.attempts, "similarity accepted");
    }

    let acts: Vec<DialogueAct> = (0..n)
        .map(|_| DialogueAct::ALL[rng.random_range(0..DialogueAct::ALL.len())])
        .collect();

    let turns = slots
        .iter()
        .enumerate()
        .map(|(i, &t)| TurnRecord {
            study: chapter.study.clone(),
            video: chapter.video,
            chapter: chapter.chapter,
            turn: t,
            turn_count: chapter.turn_count,
            chapter_length,
            turn_length: timeline.lengths[i],
            start_time: timeline.starts[i],
            end_time: timeline.ends[i],
            turns_from_inference: chapter.turn_count - t + 1,
            turn_percent_through_chapter: percents[i],
            time_percent_through_chapter: timeline.ends[i] / chapter_length * 100.0,
            speaker: speakers[i],
            similarity: draw.clamped[i],
            similarity_raw: draw.raw[i],
            act: acts[i],
        })
        .collect();

    let diagnostics = ChapterDiagnostics {
        study: chapter.study.clone(),
        video: chapter.video,
        chapter: chapter.chapter,
        attempts: draw.attempts,
        extreme_fraction: draw.extreme_fraction,
    };
    Ok((turns, diagnostics))
}
