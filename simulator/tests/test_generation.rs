//! End-to-end generation tests over the public API.
//!
//! The default-registry corpus is generated once per test binary and shared.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use turnsim::constants::{CHAPTER_COUNT, TURN_COUNT};
use turnsim::corpus::Corpus;
use turnsim::hierarchy::group_contiguous;
use turnsim::participants::SharedStimulusParams;
use turnsim::sampler::{BoundedNormal, BoundedSampler};
use turnsim::statistics::{pearson, CorpusSummary};
use turnsim::storage::corpus_csv_string;
use turnsim::types::{InferenceSchedule, Paradigm, Speaker, StudyConfig};
use turnsim::{CorpusGenerator, GenerationError, GeneratorConfig, StudyRegistry};

static CORPUS: std::sync::OnceLock<Corpus> = std::sync::OnceLock::new();

fn default_corpus() -> &'static Corpus {
    CORPUS.get_or_init(|| {
        CorpusGenerator::new(GeneratorConfig::default())
            .generate(&StudyRegistry::default())
            .unwrap()
    })
}

/// Pins nesting counts: 2 chapters per video, 5 turns per chapter, 60 s chapters.
struct StubSampler;

impl BoundedSampler for StubSampler {
    fn sample_bounded<R: Rng + ?Sized>(
        &self,
        _rng: &mut R,
        dist: &BoundedNormal,
    ) -> turnsim::Result<i64> {
        Ok(if *dist == CHAPTER_COUNT {
            2
        } else if *dist == TURN_COUNT {
            5
        } else {
            60
        })
    }
}

fn dyadic(name: &str, videos: u32) -> StudyConfig {
    StudyConfig {
        name: name.into(),
        target_count: videos,
        perceiver_count: videos,
        video_count: videos,
        paradigm: Paradigm::DyadicInteraction,
        inference_schedule: InferenceSchedule::Fixed,
        videos_per_perceiver: None,
    }
}

fn shared(name: &str, videos: u32, perceivers: u32, per: u32) -> StudyConfig {
    StudyConfig {
        name: name.into(),
        target_count: videos,
        perceiver_count: perceivers,
        video_count: videos,
        paradigm: Paradigm::SharedStimulus,
        inference_schedule: InferenceSchedule::Variable,
        videos_per_perceiver: Some(per),
    }
}

fn small_registry() -> StudyRegistry {
    StudyRegistry::new(vec![dyadic("d", 6), shared("s", 5, 8, 2)]).unwrap()
}

// ── Stub-sampler scenario ────────────────────────────────────────────

#[test]
fn stub_sampler_dyadic_three_videos() {
    let generator = CorpusGenerator::with_sampler(GeneratorConfig::default(), StubSampler);
    let corpus = generator.generate_from(&[dyadic("e2e", 3)]).unwrap();
    assert_eq!(corpus.len(), 3 * 2 * 5);
    assert_eq!(corpus.diagnostics.len(), 6);

    let turns: Vec<_> = corpus.rows.iter().map(|r| r.turn.clone()).collect();
    let chapters = group_contiguous(&turns, |t| (t.video, t.chapter));
    assert_eq!(chapters.len(), 6);
    for ch in chapters {
        assert_eq!(ch.len(), 5);
        assert_eq!(ch[0].chapter_length, 60.0);
        let sum: f64 = ch.iter().map(|t| t.turn_length).sum();
        assert!((sum - 60.0).abs() <= 0.01, "sum={sum}");
    }
}

#[test]
fn stub_scenario_generates_for_every_seed() {
    for seed in 0..50 {
        let generator =
            CorpusGenerator::with_sampler(GeneratorConfig::default().with_seed(seed), StubSampler);
        let corpus = generator
            .generate_from(&[dyadic("e2e", 3)])
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        assert_eq!(corpus.len(), 30);
        for row in &corpus.rows {
            assert_eq!(row.covariates.len(), corpus.covariates.len());
            assert!(row.covariates.iter().all(|&v| v >= 0.0));
        }
    }
}

#[test]
fn single_video_study_generates_for_every_seed() {
    for seed in 0..50 {
        let corpus = CorpusGenerator::new(GeneratorConfig::default().with_seed(seed))
            .generate_from(&[dyadic("one", 1)])
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        assert!(corpus.len() >= 12);
        assert_eq!(corpus.covariate_column(9).len(), corpus.len());
    }
}

#[test]
fn summary_records_every_chapter() {
    let corpus = CorpusGenerator::with_sampler(GeneratorConfig::default(), StubSampler)
        .generate_from(&[dyadic("sum", 3)])
        .unwrap();
    let summary = CorpusSummary::from_corpus(&corpus);
    assert_eq!(summary.chapters.len(), 6);
    assert_eq!(summary.similarity.num_chapters, 6);

    let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
    let chapters = json["chapters"].as_array().unwrap();
    assert_eq!(chapters.len(), 6);
    assert_eq!(chapters[0]["study"], "sum");
    assert!(chapters.iter().all(|c| c["attempts"].as_u64().unwrap() >= 1));
    assert_eq!(json["num_rows"], 30);
}

// ── Timeline and similarity invariants ───────────────────────────────

#[test]
fn chapter_timelines_are_consistent() {
    let corpus = default_corpus();
    let turns: Vec<_> = corpus.rows.iter().map(|r| r.turn.clone()).collect();
    for ch in group_contiguous(&turns, |t| (t.study.clone(), t.video, t.chapter)) {
        // Shared-stimulus studies repeat videos; take one viewing.
        let n = ch[0].turn_count as usize;
        let ch = &ch[..n];
        let len = ch[0].chapter_length;
        let sum: f64 = ch.iter().map(|t| t.turn_length).sum();
        assert!((sum - len).abs() <= 0.0005 * n as f64 + 1e-9);
        assert_eq!(ch[0].start_time, 0.0);
        assert!((ch[n - 1].end_time - sum).abs() < 1e-6);
        for i in 1..n {
            assert_eq!(ch[i].start_time, ch[i - 1].end_time);
            assert!(ch[i].turn_percent_through_chapter > ch[i - 1].turn_percent_through_chapter);
            assert_eq!(ch[i].turns_from_inference + 1, ch[i - 1].turns_from_inference);
        }
        assert_eq!(ch[n - 1].turns_from_inference, 1);
        assert!((ch[n - 1].turn_percent_through_chapter - 100.0).abs() < 1e-9);
        assert!(ch[0].turn_percent_through_chapter > 0.0);
    }
}

#[test]
fn similarity_bounded_and_acceptance_honored() {
    let corpus = default_corpus();
    assert!(corpus
        .rows
        .iter()
        .all(|r| (-1.0..=1.0).contains(&r.turn.similarity)));
    assert!(corpus.diagnostics.iter().all(|d| d.extreme_fraction < 0.05));

    let mut per_chapter: BTreeMap<(String, u32, u32), (usize, usize)> = BTreeMap::new();
    for r in corpus.rows.iter().filter(|r| {
        r.participants.perceiver_id.ends_with("_perceiver_1") || r.paradigm == Paradigm::DyadicInteraction
    }) {
        let t = &r.turn;
        let e = per_chapter
            .entry((t.study.clone(), t.video, t.chapter))
            .or_insert((0, 0));
        e.0 += 1;
        if t.similarity_raw.abs() >= 0.99 {
            e.1 += 1;
        }
    }
    for ((study, v, c), (n, extreme)) in per_chapter {
        assert!(
            (extreme as f64) / (n as f64) < 0.05,
            "{study} v{v} c{c}: {extreme}/{n} extreme"
        );
    }
}

#[test]
fn target_similarity_rises_faster_than_partner() {
    let summary = CorpusSummary::from_corpus(default_corpus());
    let s = &summary.similarity;
    assert!(s.mean_target_last_decile > s.mean_partner_last_decile);
    assert!(s.mean_target_last_decile > s.mean);
}

// ── Participants ─────────────────────────────────────────────────────

#[test]
fn shared_stimulus_bundles_are_distinct() {
    let corpus = default_corpus();
    let registry = StudyRegistry::default();
    for study in registry
        .studies()
        .iter()
        .filter(|s| s.paradigm == Paradigm::SharedStimulus)
    {
        let mut bundles: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();
        for r in corpus.study_rows(&study.name) {
            bundles
                .entry(r.participants.perceiver_id.as_str())
                .or_default()
                .insert(r.turn.video);
        }
        assert_eq!(bundles.len(), study.perceiver_count as usize);
        let per = study.videos_per_perceiver.unwrap() as usize;
        for videos in bundles.values() {
            assert_eq!(videos.len(), per);
        }
    }
}

#[test]
fn shared_video_keeps_target_identity_across_perceivers() {
    let corpus = default_corpus();
    let mut targets: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut perceivers: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for r in corpus.study_rows("stim_vlog") {
        targets
            .entry(r.turn.video_id())
            .or_default()
            .insert(&r.participants.target_id);
        perceivers
            .entry(r.turn.video_id())
            .or_default()
            .insert(&r.participants.perceiver_id);
    }
    assert!(targets.values().all(|t| t.len() == 1));
    assert!(perceivers.values().any(|p| p.len() > 1));
}

#[test]
fn oversized_bundle_is_configuration_error() {
    let config = GeneratorConfig::default().with_shared_stimulus(
        "s",
        SharedStimulusParams {
            n_perceivers: 3,
            n_videos_per_perceiver: 6,
        },
    );
    let err = CorpusGenerator::new(config)
        .generate(&small_registry())
        .unwrap_err();
    assert!(matches!(err, GenerationError::Configuration(_)), "{err}");
}

// ── Covariates ───────────────────────────────────────────────────────

#[test]
fn covariates_hit_similarity_targets() {
    let corpus = default_corpus();
    assert!(corpus.len() >= 5000);
    let similarity = corpus.similarity();
    for (k, spec) in corpus.covariates.iter().enumerate() {
        let col = corpus.covariate_column(k);
        assert!(col.iter().all(|&v| v >= 0.0), "{} has negatives", spec.name);
        let r = pearson(&col, &similarity);
        assert!(
            (r - spec.target_corr_with_similarity).abs() < 0.05,
            "{}: r={r:.3} target={}",
            spec.name,
            spec.target_corr_with_similarity
        );
    }
}

#[test]
fn covariates_inherit_latent_structure() {
    // Every pair shares positive latent correlation, so exposed covariates
    // should correlate positively with each other too.
    let corpus = default_corpus();
    let a = corpus.covariate_column(0);
    let b = corpus.covariate_column(4);
    assert!(pearson(&a, &b) > 0.1);
}

// ── Determinism ──────────────────────────────────────────────────────

#[test]
fn same_seed_is_byte_identical() {
    let registry = small_registry();
    let a = CorpusGenerator::new(GeneratorConfig::default().with_seed(5))
        .generate(&registry)
        .unwrap();
    let b = CorpusGenerator::new(GeneratorConfig::default().with_seed(5))
        .generate(&registry)
        .unwrap();
    assert_eq!(corpus_csv_string(&a).unwrap(), corpus_csv_string(&b).unwrap());
}

#[test]
fn different_seed_changes_table_not_schema() {
    let registry = small_registry();
    let a = corpus_csv_string(
        &CorpusGenerator::new(GeneratorConfig::default().with_seed(5))
            .generate(&registry)
            .unwrap(),
    )
    .unwrap();
    let b = corpus_csv_string(
        &CorpusGenerator::new(GeneratorConfig::default().with_seed(6))
            .generate(&registry)
            .unwrap(),
    )
    .unwrap();
    assert_ne!(a, b);
    assert_eq!(a.lines().next(), b.lines().next());
}

#[test]
fn single_study_regeneration_matches_full_run() {
    let registry = small_registry();
    let generator = CorpusGenerator::new(GeneratorConfig::default().with_seed(11));
    let full = generator.generate(&registry).unwrap();
    for study in registry.studies() {
        let alone = generator.generate_study(study).unwrap();
        let from_full: Vec<_> = full.study_rows(&study.name).collect();
        assert_eq!(alone.rows.len(), from_full.len());
        for (x, y) in alone.rows.iter().zip(from_full) {
            assert_eq!(x.turn, y.turn);
            assert_eq!(x.participants, y.participants);
        }
    }
}

// ── Output table ─────────────────────────────────────────────────────

#[test]
fn factors_encode_text_columns() {
    let corpus = default_corpus();
    let speaker = corpus.factor("speaker").unwrap();
    assert_eq!(speaker.levels, vec!["partner", "target"]);
    assert_eq!(speaker.codes.len(), corpus.len());
    for (i, r) in corpus.rows.iter().enumerate().step_by(997) {
        let expected = match r.turn.speaker {
            Speaker::Partner => 0,
            Speaker::Target => 1,
        };
        assert_eq!(speaker.codes[i], expected);
    }
    let study = corpus.factor("study").unwrap();
    assert_eq!(study.levels.len(), StudyRegistry::default().len());
    assert_eq!(corpus.factor("act").unwrap().levels.len(), 8);
    assert!(corpus.factor("similarity").is_none());
}

#[test]
fn csv_has_stable_header() {
    let corpus = CorpusGenerator::with_sampler(GeneratorConfig::default(), StubSampler)
        .generate_from(&[dyadic("h", 2)])
        .unwrap();
    let csv = corpus_csv_string(&corpus).unwrap();
    let header: Vec<&str> = csv.lines().next().unwrap().split(',').collect();
    assert_eq!(header.len(), Corpus::COLUMNS.len() + corpus.covariates.len());
    assert_eq!(header[0], "study");
    assert_eq!(header[Corpus::COLUMNS.len()], "word_count");
    assert_eq!(csv.lines().count(), 1 + 2 * 2 * 5);
}

#[test]
fn similarity_budget_exhaustion_is_typed() {
    let config = GeneratorConfig {
        similarity_max_attempts: 1,
        ..GeneratorConfig::default()
    };
    let err = CorpusGenerator::new(config)
        .generate(&StudyRegistry::default())
        .unwrap_err();
    assert!(matches!(err, GenerationError::NonConvergence { .. }), "{err}");
}
