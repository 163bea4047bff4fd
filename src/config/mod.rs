//! Configuration management
//!
//! TOML-based configuration with `${VAR}` substitution, `VEIL_*`
//! environment overrides, secret wrappers for seed and vault password, and
//! built-in named profiles.
//!
//! ```toml
//! [engine]
//! mode = "hybrid"
//! seed = "${VEIL_SEED}"
//! preserve_domain = true
//!
//! [vault]
//! path = "out/mappings.vault"
//! password = "${VEIL_VAULT_PASSWORD}"
//! ```

pub mod loader;
pub mod profiles;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use profiles::{profile, PROFILE_NAMES};
pub use schema::{EngineSettings, LoggingConfig, VaultSettings, VeilConfig};
pub use secret::{secret_bytes, secret_string, SecretString, SecretValue};
