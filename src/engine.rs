//! Engine: the coordinator that ties keys, detector, transformers and the
//! vault together
//!
//! One `Engine` value owns every cache; there is no global mutable state.
//! It is `Send + Sync` and shared by reference across worker threads: cell
//! transforms are pure CPU, only vault I/O takes a lock.

use crate::config::{secret_bytes, VeilConfig};
use crate::corpus::Corpora;
use crate::crypto::keys::KeySchedule;
use crate::detector::{Detection, TypeDetector};
use crate::domain::{DataType, MappingEntry, Mode, Result, VeilError};
use crate::transform::{
    FakeTransformer, FpeTransformer, HmacTransformer, HybridTransformer, TransformContext,
    Transformer,
};
use crate::vault::{UpsertOutcome, Vault, VaultStatistics};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collision retry budget per cell
const MAX_COLLISION_RETRIES: u32 = 8;

/// Serialized description of one run, consumed by the caller
#[derive(Debug, Clone, Serialize)]
pub struct RunParameters {
    pub mode: &'static str,
    pub profile: String,
    pub seed_present: bool,
    pub columns: Vec<ColumnParameters>,
}

/// Detector outcome for one column as it appears in [`RunParameters`]
#[derive(Debug, Clone, Serialize)]
pub struct ColumnParameters {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub confidence: f32,
    pub params: crate::detector::DetectorParams,
}

/// The anonymization engine
pub struct Engine {
    config: VeilConfig,
    mode: Mode,
    keys: KeySchedule,
    corpora: Arc<Corpora>,
    detector: TypeDetector,
    vault: Option<Vault>,
    detections: RwLock<HashMap<String, Arc<Detection>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from a validated configuration
    ///
    /// Opens (or creates) the vault unless the mode bypasses it or the
    /// configuration is fully synthetic. A vault created without a password
    /// gets its generated key exported to the configured key file.
    pub fn new(config: VeilConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.engine.seed.as_ref().map(secret_bytes);
        let keys = KeySchedule::from_seed(seed);
        let corpora = Arc::new(Corpora::load()?);
        let detector = TypeDetector::new(Arc::clone(&corpora))?;
        let mode = config.engine.mode;

        let vault = if mode.uses_vault() && !config.engine.fully_synthetic {
            match &config.vault.path {
                Some(path) => Some(Self::open_vault(&config, path, &keys)?),
                None => None,
            }
        } else {
            None
        };

        info!(
            mode = mode.tag(),
            profile = %config.engine.profile,
            seed_present = keys.seed_present(),
            vault = vault.is_some(),
            "engine ready"
        );

        Ok(Self {
            config,
            mode,
            keys,
            corpora,
            detector,
            vault,
            detections: RwLock::new(HashMap::new()),
        })
    }

    fn open_vault(config: &VeilConfig, path: &std::path::Path, keys: &KeySchedule) -> Result<Vault> {
        let key_file = config
            .vault
            .key_file
            .clone()
            .unwrap_or_else(|| path.with_extension("key.json"));

        if let Some(password) = &config.vault.password {
            return Vault::open(path, keys.master(), Some(secret_bytes(password)));
        }
        if key_file.exists() {
            let key = Vault::read_key_file(&key_file)?;
            return Vault::open_with_key(path, keys.master(), key);
        }

        let vault = Vault::open(path, keys.master(), None)?;
        if vault.has_generated_key() {
            vault.export_key_file(&key_file)?;
            info!(key_file = %key_file.display(), "vault key generated and exported");
        }
        Ok(vault)
    }

    /// Current anonymization mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch modes; call before sharing the engine across workers
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Classify a column from a bounded sample, priming the per-column cache
    ///
    /// Call once per column before dispatching parallel rows so steady-state
    /// reads stay lock-free. An undecidable sample falls back to free text.
    pub fn profile_column(&self, column: &str, samples: &[String]) -> Arc<Detection> {
        if let Some(cached) = self.detections.read().get(column) {
            return Arc::clone(cached);
        }
        let detection = Arc::new(self.classify(column, samples));
        self.detections
            .write()
            .insert(column.to_string(), Arc::clone(&detection));
        detection
    }

    fn classify(&self, column: &str, samples: &[String]) -> Detection {
        if let Some(tag) = self.config.engine.type_overrides.get(column) {
            let data_type = DataType::from_tag(tag).expect("validated at construction");
            debug!(column, data_type = tag.as_str(), "type override");
            return Detection::overridden(data_type);
        }
        match self.detector.detect(column, samples) {
            Ok(detection) => {
                debug!(
                    column,
                    data_type = detection.data_type.tag(),
                    confidence = detection.confidence,
                    "column classified"
                );
                detection
            }
            Err(VeilError::DetectorUndecided(_)) => {
                warn!(column, "detector undecided, falling back to free text");
                Detection {
                    data_type: DataType::FreeText,
                    confidence: 0.0,
                    params: Default::default(),
                }
            }
            Err(e) => {
                warn!(column, error = %e, "detection failed, treating as free text");
                Detection {
                    data_type: DataType::FreeText,
                    confidence: 0.0,
                    params: Default::default(),
                }
            }
        }
    }

    fn detection_for(&self, column: &str, value: &str) -> Arc<Detection> {
        if let Some(cached) = self.detections.read().get(column) {
            return Arc::clone(cached);
        }
        // Cache miss outside profile_column: classify from the single cell
        self.profile_column(column, std::slice::from_ref(&value.to_string()))
    }

    /// Anonymize one cell
    ///
    /// Empty values and columns outside the anonymize set pass through
    /// unchanged. Results are stable: the vault (when present) guarantees
    /// the first successful writer wins and every later caller observes the
    /// same replacement.
    pub fn anonymize(&self, column: &str, value: &str) -> Result<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(value.to_string());
        }
        if let Some(columns) = &self.config.engine.columns {
            if !columns.iter().any(|c| c == column) {
                return Ok(value.to_string());
            }
        }

        match self.anonymize_cell(column, trimmed) {
            Ok(out) => Ok(out),
            Err(e) if self.is_lenient_recoverable(&e) => {
                warn!(column, error = %e, "lenient mode: returning original cell");
                Ok(value.to_string())
            }
            Err(e) => Err(e),
        }
    }

    fn is_lenient_recoverable(&self, error: &VeilError) -> bool {
        !self.config.engine.strict
            && matches!(
                error,
                VeilError::ExhaustedDomain { .. } | VeilError::VaultIo(_)
            )
    }

    fn anonymize_cell(&self, column: &str, value: &str) -> Result<String> {
        if let Some(vault) = &self.vault {
            if let Some(hit) = vault.get_forward(column, value)? {
                return Ok(hit);
            }
        }

        let detection = self.detection_for(column, value);
        let transformer = self.transformer();

        for attempt in 0..MAX_COLLISION_RETRIES {
            let ctx = TransformContext {
                column,
                column_key: self.keys.column_key(column),
                keys: &self.keys,
                corpora: &self.corpora,
                detection: &detection,
                preserve_domain: self.config.engine.preserve_domain,
                attempt,
            };
            let candidate = match transformer.transform(&ctx, value) {
                Ok(candidate) => candidate,
                Err(VeilError::FormatUnparseable { kind, detail }) => {
                    warn!(column, kind, detail = %detail, "unparseable for detected type, using free-text fallback");
                    let fallback = Detection {
                        data_type: DataType::FreeText,
                        confidence: 0.0,
                        params: Default::default(),
                    };
                    let ctx = TransformContext {
                        detection: &fallback,
                        ..ctx
                    };
                    transformer.transform(&ctx, value)?
                }
                Err(e) => return Err(e),
            };

            let vault = match &self.vault {
                None => return Ok(candidate),
                Some(vault) => vault,
            };

            // Reverse-uniqueness check: a different original already mapping
            // to this candidate within the column forces a perturbed retry
            match vault.get_reverse(column, &candidate)? {
                Some(existing) if existing != value => {
                    debug!(column, attempt, "anonymized collision, retrying");
                    continue;
                }
                _ => {}
            }

            let entry = MappingEntry::new(column, value, candidate.clone(), detection.data_type);
            return match vault.upsert(entry)? {
                UpsertOutcome::Inserted => Ok(candidate),
                // A concurrent writer won the race; adopt its value
                UpsertOutcome::AlreadyExists(stored) => Ok(stored),
            };
        }

        Err(VeilError::ExhaustedDomain {
            column: column.to_string(),
            attempts: MAX_COLLISION_RETRIES,
        })
    }

    /// Reverse one cell through the vault
    ///
    /// Returns `None` when the value is unknown, the vault is absent, or
    /// the mode never stores (hmac).
    pub fn deanonymize(&self, column: &str, value: &str) -> Result<Option<String>> {
        if !self.mode.uses_vault() {
            return Ok(None);
        }
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match &self.vault {
            Some(vault) => vault.get_reverse(column, trimmed),
            None => Ok(None),
        }
    }

    fn transformer(&self) -> Box<dyn Transformer> {
        match self.mode {
            Mode::Fake => Box::new(FakeTransformer),
            Mode::Fpe => Box::new(FpeTransformer),
            Mode::Hmac => Box::new(HmacTransformer),
            Mode::Hybrid => Box::new(HybridTransformer::new()),
        }
    }

    /// Serialized per-run parameters for the caller's report
    pub fn run_parameters(&self) -> RunParameters {
        let mut columns: Vec<ColumnParameters> = self
            .detections
            .read()
            .iter()
            .map(|(name, detection)| ColumnParameters {
                name: name.clone(),
                data_type: detection.data_type,
                confidence: detection.confidence,
                params: detection.params.clone(),
            })
            .collect();
        columns.sort_by(|a, b| a.name.cmp(&b.name));

        RunParameters {
            mode: self.mode.tag(),
            profile: self.config.engine.profile.clone(),
            seed_present: self.keys.seed_present(),
            columns,
        }
    }

    /// Durably commit vault writes
    pub fn flush(&self) -> Result<()> {
        match &self.vault {
            Some(vault) => vault.flush(),
            None => Ok(()),
        }
    }

    /// Vault statistics, when a vault is open
    pub fn vault_statistics(&self) -> Result<Option<VaultStatistics>> {
        match &self.vault {
            Some(vault) => vault.statistics().map(Some),
            None => Ok(None),
        }
    }
}
