//! Seed derivation: independent random sub-streams per (stage, study).
//!
//! Every generation stage owns its own `ChaCha8Rng`. The stage seed is derived
//! from the base seed, a stage tag and an FNV-1a hash of the study name, then
//! mixed through SplitMix64. Regenerating one study therefore consumes exactly
//! the same draws it receives inside a full multi-study run, and the covariate
//! stage never shares a stream with structure generation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One SplitMix64 step: advance `x` by the golden-ratio increment and finalize.
#[inline]
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Generation stages, each with its own stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Nesting counts, timing, speakers, similarity, acts.
    Structure,
    /// Shared-stimulus video bundles.
    Participants,
    /// Latent block and exposed covariates (corpus-wide).
    Covariates,
}

impl Stage {
    fn tag(self) -> u64 {
        match self {
            Stage::Structure => 0x5354_5255,
            Stage::Participants => 0x5041_5254,
            Stage::Covariates => 0x434f_5641,
        }
    }
}

/// 64-bit FNV-1a. Stable across platforms and compiler versions.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Derive the seed for `stage`, optionally scoped to one study.
pub fn derive_seed(base_seed: u64, stage: Stage, scope: Option<&str>) -> u64 {
    let scope_hash = scope.map(|s| fnv1a(s.as_bytes())).unwrap_or(0);
    splitmix64(splitmix64(base_seed ^ stage.tag()) ^ scope_hash)
}

/// Build the RNG for `stage` (and study, if scoped).
///
/// ChaCha8 output is fixed by its algorithm, so a seed yields the same
/// stream on every platform and `rand_chacha` release.
pub fn stage_rng(base_seed: u64, stage: Stage, scope: Option<&str>) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_seed(base_seed, stage, scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_mixer_reference_output() {
        // First SplitMix64 output for state 0.
        assert_eq!(splitmix64(0), 0xe220a8397b1dcdaf);
        assert_ne!(splitmix64(1), splitmix64(2));
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_stage_seeds_differ() {
        let a = derive_seed(42, Stage::Structure, Some("dyad"));
        let b = derive_seed(42, Stage::Participants, Some("dyad"));
        let c = derive_seed(42, Stage::Structure, Some("stim"));
        let d = derive_seed(42, Stage::Covariates, None);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a, derive_seed(42, Stage::Structure, Some("dyad")));
    }

    #[test]
    fn test_derived_seeds_pinned() {
        // Integer-only mixing: identical on every target.
        assert_eq!(derive_seed(42, Stage::Structure, Some("dyad")), 0x6032e01fea024421);
        assert_eq!(derive_seed(42, Stage::Covariates, None), 0x8d88c0c9fe74f79b);
    }

    #[test]
    fn test_stage_rng_reproducible() {
        let mut r1 = stage_rng(7, Stage::Structure, Some("s"));
        let mut r2 = stage_rng(7, Stage::Structure, Some("s"));
        for _ in 0..50 {
            assert_eq!(r1.random::<u64>(), r2.random::<u64>());
        }
    }
}
