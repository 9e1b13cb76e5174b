use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use turnsim::env_config;
use turnsim::statistics::CorpusSummary;
use turnsim::storage::{save_corpus_csv, save_summary};
use turnsim::{CorpusGenerator, GenerationError, GeneratorConfig, StudyRegistry};

/// Generate a synthetic multi-study conversation corpus.
#[derive(Parser, Debug)]
#[command(name = "turnsim-generate", version)]
struct Args {
    /// Base RNG seed (overrides config file and TURNSIM_SEED).
    #[arg(long)]
    seed: Option<u64>,

    /// JSON array of study configurations (default: built-in registry).
    #[arg(long)]
    registry: Option<PathBuf>,

    /// JSON generator configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for corpus.csv and summary.json (default: TURNSIM_OUTPUT).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Regenerate only this study.
    #[arg(long)]
    study: Option<String>,
}

fn run(args: Args) -> turnsim::Result<()> {
    let _base = env_config::init_base_path()?;

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(seed) = env_config::seed_override()? {
        config.seed = seed;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let registry = match &args.registry {
        Some(path) => StudyRegistry::from_json_file(path)?,
        None => StudyRegistry::default(),
    };
    let output = args.output.unwrap_or_else(env_config::output_dir);

    info!(seed = config.seed, studies = registry.len(), "generating corpus");
    let t0 = Instant::now();
    let generator = CorpusGenerator::new(config);
    let corpus = match &args.study {
        Some(name) => {
            let study = registry
                .get(name)
                .ok_or_else(|| GenerationError::config(format!("unknown study '{name}'")))?;
            generator.generate_from(std::slice::from_ref(study))?
        }
        None => generator.generate(&registry)?,
    };
    info!(
        rows = corpus.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "corpus generated"
    );

    let summary = CorpusSummary::from_corpus(&corpus);
    for cov in &summary.covariates {
        info!(
            covariate = %cov.name,
            target = cov.target_corr_with_similarity,
            empirical = cov.empirical_corr_with_similarity,
            "similarity correlation"
        );
    }

    let csv_path = output.join("corpus.csv");
    let summary_path = output.join("summary.json");
    save_corpus_csv(&corpus, &csv_path)?;
    save_summary(&summary, &summary_path)?;
    info!(csv = %csv_path.display(), summary = %summary_path.display(), "written");
    Ok(())
}

fn main() {
    env_config::init_tracing();
    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}
