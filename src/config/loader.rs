//! Configuration loader: TOML with `${VAR}` substitution and `VEIL_*`
//! overrides
//!
//! Loading order: read file, substitute `${VAR}` placeholders, parse,
//! apply environment overrides, validate.

use super::schema::VeilConfig;
use crate::domain::{Result, VeilError};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Load a configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<VeilConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VeilError::Configuration(format!(
            "configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        VeilError::Configuration(format!("failed to read {}: {e}", path.display()))
    })?;
    let contents = substitute_env_vars(&contents)?;

    let mut config: VeilConfig = toml::from_str(&contents)
        .map_err(|e| VeilError::Configuration(format!("failed to parse TOML: {e}")))?;
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// Substitute `${VAR_NAME}` placeholders outside comment lines
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");
    let mut result = String::with_capacity(input.len());
    let mut missing: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }
        let mut processed = line.to_string();
        for cap in re.captures_iter(line) {
            let name = &cap[1];
            match std::env::var(name) {
                Ok(value) => {
                    processed = processed.replace(&format!("${{{name}}}"), &value);
                }
                Err(_) => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing.is_empty() {
        return Err(VeilError::Configuration(format!(
            "missing required environment variables: {}",
            missing.join(", ")
        )));
    }
    Ok(result)
}
