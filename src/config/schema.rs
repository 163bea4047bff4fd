//! Configuration schema, defaults, validation and environment overrides

use super::secret::SecretString;
use crate::domain::{DataType, Mode, Result, VeilError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeilConfig {
    /// Engine behavior
    #[serde(default)]
    pub engine: EngineSettings,
    /// Mapping vault storage
    #[serde(default)]
    pub vault: VaultSettings,
    /// Logging sinks
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Anonymization mode
    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// Label recorded in run parameters
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Strict mode surfaces per-cell errors; lenient returns the original
    /// cell and logs a warning
    #[serde(default = "default_strict")]
    pub strict: bool,

    /// Map equal email domains to equal anonymized domains
    #[serde(default)]
    pub preserve_domain: bool,

    /// Skip vault storage entirely (synthetic output only)
    #[serde(default)]
    pub fully_synthetic: bool,

    /// Columns to anonymize; `None` means every column
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    /// Per-column data type overrides (column name to type tag)
    #[serde(default)]
    pub type_overrides: HashMap<String, String>,

    /// Determinism seed; omit for a non-reproducible random run
    #[serde(default)]
    pub seed: Option<SecretString>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            profile: default_profile(),
            strict: default_strict(),
            preserve_domain: false,
            fully_synthetic: false,
            columns: None,
            type_overrides: HashMap::new(),
            seed: None,
        }
    }
}

/// Vault storage settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VaultSettings {
    /// Vault file; omit to run without persistence
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Encryption password; omit to generate and export a key file
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Where the generated key file goes (default: `<path>.key.json`)
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to a rolling local file
    #[serde(default)]
    pub local_enabled: bool,

    /// Log directory
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation: "daily" or "hourly"
    #[serde(default = "default_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_rotation(),
        }
    }
}

fn default_mode() -> Mode {
    Mode::Hybrid
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_strict() -> bool {
    true
}

fn default_log_path() -> String {
    "./logs".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl VeilConfig {
    /// Validate before any cell is processed
    pub fn validate(&self) -> Result<()> {
        for (column, tag) in &self.engine.type_overrides {
            if DataType::from_tag(tag).is_none() {
                return Err(VeilError::Configuration(format!(
                    "unknown data type '{tag}' in type_overrides for column '{column}'"
                )));
            }
        }
        if let Some(columns) = &self.engine.columns {
            if columns.is_empty() {
                return Err(VeilError::Configuration(
                    "engine.columns is present but empty; omit it to anonymize everything"
                        .to_string(),
                ));
            }
        }
        if !matches!(self.logging.local_rotation.as_str(), "daily" | "hourly") {
            return Err(VeilError::Configuration(format!(
                "invalid logging.local_rotation '{}'",
                self.logging.local_rotation
            )));
        }
        if self.vault.path.is_none() && self.vault.password.is_some() {
            return Err(VeilError::Configuration(
                "vault.password set without vault.path".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `VEIL_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        use super::secret::secret_string;

        if let Ok(val) = std::env::var("VEIL_ENGINE_MODE") {
            self.engine.mode = Mode::from_tag(&val.to_lowercase()).ok_or_else(|| {
                VeilError::Configuration(format!(
                    "invalid VEIL_ENGINE_MODE '{val}': must be fake, fpe, hmac or hybrid"
                ))
            })?;
        }
        if let Ok(val) = std::env::var("VEIL_ENGINE_PROFILE") {
            self.engine.profile = val;
        }
        if let Ok(val) = std::env::var("VEIL_ENGINE_STRICT") {
            self.engine.strict = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("VEIL_ENGINE_PRESERVE_DOMAIN") {
            self.engine.preserve_domain = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("VEIL_ENGINE_FULLY_SYNTHETIC") {
            self.engine.fully_synthetic = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("VEIL_ENGINE_SEED") {
            self.engine.seed = Some(secret_string(val));
        }
        if let Ok(val) = std::env::var("VEIL_ENGINE_COLUMNS") {
            let columns = parse_string_array(&val);
            self.engine.columns = if columns.is_empty() { None } else { Some(columns) };
        }
        if let Ok(val) = std::env::var("VEIL_VAULT_PATH") {
            self.vault.path = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("VEIL_VAULT_PASSWORD") {
            self.vault.password = Some(secret_string(val));
        }
        if let Ok(val) = std::env::var("VEIL_VAULT_KEY_FILE") {
            self.vault.key_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_ENABLED") {
            self.logging.local_enabled = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_PATH") {
            self.logging.local_path = val;
        }
        if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_ROTATION") {
            self.logging.local_rotation = val;
        }
        Ok(())
    }
}

/// Parse `["a","b"]` or `a,b` into a vector
pub(crate) fn parse_string_array(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return vec![];
    }
    if let Ok(arr) = serde_json::from_str::<Vec<String>>(trimmed) {
        return arr;
    }
    trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
