//! Key schedule: master key derivation and per-column sub-keys
//!
//! The master key is derived from the user seed with PBKDF2-HMAC-SHA256 and
//! a fixed application salt; per-column sub-keys are HMACs of the column
//! name. Vault encryption keys are derived separately so vault storage can
//! be rotated without reshuffling mappings.

use super::hmac_sha256;
use parking_lot::RwLock;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::collections::HashMap;

/// Fixed application salt for master key derivation
const MASTER_SALT: &[u8] = b"anonymizer-v1";

/// PBKDF2 iteration count for both master and vault keys
pub const PBKDF2_ITERATIONS: u32 = 200_000;

/// Derives and caches every key the engine needs
pub struct KeySchedule {
    master: [u8; 32],
    seed_present: bool,
    column_keys: RwLock<HashMap<String, [u8; 32]>>,
}

impl KeySchedule {
    /// Derive the master key from an optional seed
    ///
    /// Without a seed the master key is process-random, which makes the run
    /// non-reproducible; callers should surface the generated seed if
    /// reproducibility matters.
    pub fn from_seed(seed: Option<&[u8]>) -> Self {
        let (master, seed_present) = match seed {
            Some(seed) => (derive_master(seed), true),
            None => {
                let mut key = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                (key, false)
            }
        };
        Self {
            master,
            seed_present,
            column_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Whether a user seed was supplied
    pub fn seed_present(&self) -> bool {
        self.seed_present
    }

    // The vault hashes record keys under the master key directly
    pub(crate) fn master(&self) -> [u8; 32] {
        self.master
    }

    /// Per-column sub-key: `HMAC-SHA256(master_key, column_name)`, memoized
    pub fn column_key(&self, column: &str) -> [u8; 32] {
        if let Some(key) = self.column_keys.read().get(column) {
            return *key;
        }
        let key = hmac_sha256(&self.master, &[column.as_bytes()]);
        self.column_keys.write().insert(column.to_string(), key);
        key
    }

    /// Deterministic MAC for the domain map: same domain, same MAC,
    /// regardless of which column the email came from
    pub fn domain_mac(&self, domain: &str) -> [u8; 32] {
        hmac_sha256(&self.master, &[b"domain:", domain.as_bytes()])
    }
}

/// PBKDF2-HMAC-SHA256 master key derivation
pub fn derive_master(seed: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(seed, MASTER_SALT, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Derive the vault encryption key from a password and per-vault salt
///
/// Without a password a fresh random key is returned; the second element is
/// `true` when the key was generated and must be exported for later reads.
pub fn derive_vault_key(password: Option<&[u8]>, salt: &[u8; 16]) -> ([u8; 32], bool) {
    match password {
        Some(password) => {
            let mut key = [0u8; 32];
            pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ITERATIONS, &mut key);
            (key, false)
        }
        None => {
            let mut key = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut key);
            (key, true)
        }
    }
}
