//! Shared environment configuration for the turnsim binaries.
//!
//! Consolidates `TURNSIM_BASE_PATH`, `TURNSIM_SEED`, `TURNSIM_OUTPUT` and the
//! `RUST_LOG` tracing filter.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{GenerationError, Result};

/// Install the global tracing subscriber. Filter from `RUST_LOG`, default `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed (tests, embedding callers).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Read `TURNSIM_BASE_PATH` (default `"."`) and chdir into it.
pub fn init_base_path() -> Result<PathBuf> {
    let base_path = std::env::var("TURNSIM_BASE_PATH").unwrap_or_else(|_| ".".to_string());
    std::env::set_current_dir(&base_path).map_err(|e| {
        GenerationError::config(format!("failed to change directory to {base_path}: {e}"))
    })?;
    if let Ok(cwd) = std::env::current_dir() {
        info!(cwd = %cwd.display(), "working directory");
    }
    Ok(PathBuf::from(base_path))
}

/// Read `TURNSIM_SEED`, if set.
pub fn seed_override() -> Result<Option<u64>> {
    match std::env::var("TURNSIM_SEED") {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GenerationError::config(format!("invalid TURNSIM_SEED '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Read `TURNSIM_OUTPUT` (default `outputs/turnsim`).
pub fn output_dir() -> PathBuf {
    std::env::var("TURNSIM_OUTPUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("outputs/turnsim"))
}
