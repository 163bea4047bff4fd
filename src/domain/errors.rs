//! Domain error types
//!
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Veil error type
///
/// This is the primary error type used throughout the library. Variants map
/// onto the recovery policy: vault failures and exhausted domains are fatal
/// for the affected cell (or run), detector and format failures are
/// recovered locally by falling back to free-text handling.
#[derive(Debug, Error)]
pub enum VeilError {
    /// Configuration-related errors, raised before any cell is processed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Vault read/write failures (disk full, truncated file, bad record)
    #[error("Vault I/O error: {0}")]
    VaultIo(String),

    /// Authentication failure: wrong vault password or tampered file
    #[error("Vault authentication failed: {0}")]
    VaultAuth(String),

    /// The detector could not classify a column
    #[error("Could not determine a data type for column '{0}'")]
    DetectorUndecided(String),

    /// No collision-free candidate found within the retry budget
    #[error("Anonymization domain exhausted for column '{column}' after {attempts} attempts")]
    ExhaustedDomain { column: String, attempts: u32 },

    /// A value did not parse as the detected type (date, IBAN, ...)
    #[error("Unparseable {kind} value: {detail}")]
    FormatUnparseable { kind: &'static str, detail: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors outside the vault (key files, corpora)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        VeilError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for VeilError {
    fn from(err: toml::de::Error) -> Self {
        VeilError::Configuration(format!("TOML parse error: {err}"))
    }
}
