//! Built-in anonymization profiles

use super::schema::VeilConfig;
use super::secret::secret_string;
use crate::domain::Mode;

/// Profile names accepted by [`profile`]
pub const PROFILE_NAMES: [&str; 5] = [
    "default",
    "reversible",
    "test_data",
    "fast_hash",
    "referential",
];

/// Resolve a named profile into a starting configuration
///
/// Profiles are presets, not policies: callers layer their own seed, vault
/// path and column selection on top.
pub fn profile(name: &str) -> Option<VeilConfig> {
    let mut config = VeilConfig::default();
    config.engine.profile = name.to_string();
    match name {
        // Hybrid with vault-backed reversibility; the everyday choice
        "default" => {
            config.engine.mode = Mode::Hybrid;
        }
        // Straight FPE everywhere, mappings stored for audited reversal
        "reversible" => {
            config.engine.mode = Mode::Fpe;
        }
        // Synthetic test fixtures: fixed seed, nothing persisted
        "test_data" => {
            config.engine.mode = Mode::Fake;
            config.engine.fully_synthetic = true;
            config.engine.seed = Some(secret_string("test-data-seed".to_string()));
        }
        // One-way hashing, no vault, fastest
        "fast_hash" => {
            config.engine.mode = Mode::Hmac;
        }
        // Cross-dataset referential integrity via a shared fixed seed
        "referential" => {
            config.engine.mode = Mode::Hybrid;
            config.engine.preserve_domain = true;
            config.engine.seed = Some(secret_string("consistent-seed".to_string()));
        }
        _ => return None,
    }
    Some(config)
}
