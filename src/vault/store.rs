//! Single-file encrypted mapping store
//!
//! The vault file starts with a fixed header (magic, per-vault salt, PBKDF2
//! iteration count) followed by append-only records. Each mapping is stored
//! twice, once under a forward key and once under a reverse key, so both
//! lookup directions are O(1). Record keys are truncated HMACs of the
//! plaintext key material; the plaintext itself lives only inside the
//! AES-256-GCM payload.

use crate::crypto::hmac_sha256;
use crate::crypto::keys;
use crate::domain::{MappingEntry, Result, VeilError};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// File magic; a vault that does not start with this refuses to open
pub const MAGIC: &[u8; 6] = b"ANOV1\0";

const SALT_LEN: usize = 16;
const HEADER_LEN: u64 = 6 + SALT_LEN as u64 + 4;
const FINGERPRINT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const RECORD_HEADER_LEN: usize = 1 + FINGERPRINT_LEN + NONCE_LEN + 4;

const DIR_FORWARD: u8 = 0x00;
const DIR_REVERSE: u8 = 0x01;

/// Outcome of an atomic upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// This caller created the mapping
    Inserted,
    /// Another writer got there first; carries the stored anonymized value
    AlreadyExists(String),
}

/// Aggregate counts for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct VaultStatistics {
    pub total_mappings: usize,
    pub by_type: HashMap<String, usize>,
    pub by_column: HashMap<String, usize>,
}

/// Exported decryption key document
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    version: u32,
    key: String,
    algorithm: String,
    created_at: String,
}

struct VaultInner {
    file: File,
    end: u64,
    forward: HashMap<[u8; FINGERPRINT_LEN], u64>,
    reverse: HashMap<[u8; FINGERPRINT_LEN], u64>,
}

/// Encrypted persistent bidirectional map of original ↔ anonymized values
pub struct Vault {
    path: PathBuf,
    master_key: [u8; 32],
    key_bytes: [u8; 32],
    cipher: Aes256Gcm,
    generated_key: bool,
    inner: Mutex<VaultInner>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Vault {
    /// Open or create a vault, deriving the encryption key from `password`
    /// and the per-vault salt
    ///
    /// Without a password a fresh random key is generated; callers must
    /// export it with [`export_key_file`](Self::export_key_file) or the
    /// vault contents are unreadable in later runs.
    pub fn open(path: impl AsRef<Path>, master_key: [u8; 32], password: Option<&[u8]>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, end, salt, iterations, created) = open_file(&path)?;

        let (key_bytes, generated_key) = match password {
            Some(password) => {
                let mut key = [0u8; 32];
                pbkdf2_hmac::<Sha256>(password, &salt, iterations, &mut key);
                (key, false)
            }
            None => keys::derive_vault_key(None, &salt),
        };

        Self::build(path, master_key, key_bytes, generated_key, file, end, created)
    }

    /// Open a vault with a key loaded from an exported key file
    pub fn open_with_key(path: impl AsRef<Path>, master_key: [u8; 32], key: [u8; 32]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, end, _salt, _iterations, created) = open_file(&path)?;
        Self::build(path, master_key, key, false, file, end, created)
    }

    fn build(
        path: PathBuf,
        master_key: [u8; 32],
        key_bytes: [u8; 32],
        generated_key: bool,
        file: File,
        end: u64,
        created: bool,
    ) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| VeilError::VaultAuth(format!("invalid vault key: {e}")))?;

        let vault = Self {
            path,
            master_key,
            key_bytes,
            cipher,
            generated_key,
            inner: Mutex::new(VaultInner {
                file,
                end,
                forward: HashMap::new(),
                reverse: HashMap::new(),
            }),
        };
        vault.scan_records()?;

        if !created {
            vault.verify_key()?;
        }
        Ok(vault)
    }

    /// Whether the encryption key was generated (no password supplied)
    pub fn has_generated_key(&self) -> bool {
        self.generated_key
    }

    /// Write the §6 key file document next to the vault
    pub fn export_key_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let doc = KeyFile {
            version: 1,
            key: BASE64.encode(self.key_bytes),
            algorithm: "AES-256-GCM".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Parse an exported key file back into raw key bytes
    pub fn read_key_file(path: impl AsRef<Path>) -> Result<[u8; 32]> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let doc: KeyFile = serde_json::from_str(&raw)?;
        let bytes = BASE64
            .decode(doc.key)
            .map_err(|e| VeilError::VaultAuth(format!("malformed key file: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| VeilError::VaultAuth("key file does not hold 32 bytes".to_string()))
    }

    /// Forward lookup: stored anonymized value for (column, original)
    pub fn get_forward(&self, column: &str, original: &str) -> Result<Option<String>> {
        let fingerprint = self.fingerprint(DIR_FORWARD, column, original);
        let mut inner = self.inner.lock();
        match inner.forward.get(&fingerprint).copied() {
            Some(offset) => {
                let entry = self.read_entry(&mut inner, offset)?;
                Ok(Some(entry.anonymized))
            }
            None => Ok(None),
        }
    }

    /// Reverse lookup: stored original value for (column, anonymized)
    pub fn get_reverse(&self, column: &str, anonymized: &str) -> Result<Option<String>> {
        let fingerprint = self.fingerprint(DIR_REVERSE, column, anonymized);
        let mut inner = self.inner.lock();
        match inner.reverse.get(&fingerprint).copied() {
            Some(offset) => {
                let entry = self.read_entry(&mut inner, offset)?;
                Ok(Some(entry.original))
            }
            None => Ok(None),
        }
    }

    /// Atomic insert of a mapping
    ///
    /// If a mapping for (column, original) already exists — including one
    /// written by a concurrent caller between their lookup and this call —
    /// nothing is written and the stored anonymized value is returned.
    pub fn upsert(&self, entry: MappingEntry) -> Result<UpsertOutcome> {
        let fwd = self.fingerprint(DIR_FORWARD, &entry.column, &entry.original);
        let rev = self.fingerprint(DIR_REVERSE, &entry.column, &entry.anonymized);

        let mut inner = self.inner.lock();
        if let Some(offset) = inner.forward.get(&fwd).copied() {
            let existing = self.read_entry(&mut inner, offset)?;
            return Ok(UpsertOutcome::AlreadyExists(existing.anonymized));
        }

        let plaintext = serde_json::to_vec(&entry)?;
        let fwd_offset = self.append_record(&mut inner, DIR_FORWARD, fwd, &plaintext)?;
        let rev_offset = self.append_record(&mut inner, DIR_REVERSE, rev, &plaintext)?;
        inner.forward.insert(fwd, fwd_offset);
        inner.reverse.insert(rev, rev_offset);
        Ok(UpsertOutcome::Inserted)
    }

    /// All mappings of one column, for diagnostics
    pub fn iter_column(&self, column: &str) -> Result<impl Iterator<Item = MappingEntry>> {
        let mut entries = Vec::new();
        let mut inner = self.inner.lock();
        let offsets: Vec<u64> = inner.forward.values().copied().collect();
        for offset in offsets {
            let entry = self.read_entry(&mut inner, offset)?;
            if entry.column == column {
                entries.push(entry);
            }
        }
        drop(inner);
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries.into_iter())
    }

    /// Durably commit pending writes
    pub fn flush(&self) -> Result<()> {
        let inner = self.inner.lock();
        inner
            .file
            .sync_all()
            .map_err(|e| VeilError::VaultIo(format!("flush of {} failed: {e}", self.path.display())))
    }

    /// Aggregate mapping counts by type and column
    pub fn statistics(&self) -> Result<VaultStatistics> {
        let mut stats = VaultStatistics {
            total_mappings: 0,
            by_type: HashMap::new(),
            by_column: HashMap::new(),
        };
        let mut inner = self.inner.lock();
        let offsets: Vec<u64> = inner.forward.values().copied().collect();
        for offset in offsets {
            let entry = self.read_entry(&mut inner, offset)?;
            stats.total_mappings += 1;
            *stats.by_type.entry(entry.data_type.tag().to_string()).or_insert(0) += 1;
            *stats.by_column.entry(entry.column).or_insert(0) += 1;
        }
        Ok(stats)
    }

    fn fingerprint(&self, dir: u8, column: &str, value: &str) -> [u8; FINGERPRINT_LEN] {
        let mac = hmac_sha256(&self.master_key, &[column.as_bytes(), &[dir], value.as_bytes()]);
        mac[..FINGERPRINT_LEN].try_into().expect("16 bytes")
    }

    fn append_record(
        &self,
        inner: &mut VaultInner,
        dir: u8,
        fingerprint: [u8; FINGERPRINT_LEN],
        plaintext: &[u8],
    ) -> Result<u64> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut aad = Vec::with_capacity(1 + FINGERPRINT_LEN);
        aad.push(dir);
        aad.extend_from_slice(&fingerprint);

        let ciphertext = self
            .cipher
            .encrypt(nonce, Payload { msg: plaintext, aad: &aad })
            .map_err(|_| VeilError::VaultIo("AEAD encryption failed".to_string()))?;

        let offset = inner.end;
        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + ciphertext.len());
        record.push(dir);
        record.extend_from_slice(&fingerprint);
        record.extend_from_slice(&nonce_bytes);
        record.extend_from_slice(&(ciphertext.len() as u32).to_be_bytes());
        record.extend_from_slice(&ciphertext);

        inner
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| inner.file.write_all(&record))
            .map_err(|e| VeilError::VaultIo(format!("write to {} failed: {e}", self.path.display())))?;
        inner.end += record.len() as u64;
        Ok(offset)
    }

    fn read_entry(&self, inner: &mut VaultInner, offset: u64) -> Result<MappingEntry> {
        let io_err = |e: std::io::Error| {
            VeilError::VaultIo(format!(
                "read at offset {offset} in {} failed: {e}",
                self.path.display()
            ))
        };

        let mut header = [0u8; RECORD_HEADER_LEN];
        inner
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| inner.file.read_exact(&mut header))
            .map_err(io_err)?;

        let dir = header[0];
        let fingerprint = &header[1..1 + FINGERPRINT_LEN];
        let nonce_bytes = &header[1 + FINGERPRINT_LEN..1 + FINGERPRINT_LEN + NONCE_LEN];
        let ct_len = u32::from_be_bytes(header[RECORD_HEADER_LEN - 4..].try_into().expect("4 bytes"));

        let mut ciphertext = vec![0u8; ct_len as usize];
        inner.file.read_exact(&mut ciphertext).map_err(io_err)?;

        let mut aad = Vec::with_capacity(1 + FINGERPRINT_LEN);
        aad.push(dir);
        aad.extend_from_slice(fingerprint);

        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, Payload { msg: &ciphertext, aad: &aad })
            .map_err(|_| {
                VeilError::VaultAuth(format!(
                    "record authentication failed (key fingerprint {})",
                    hex(fingerprint)
                ))
            })?;

        serde_json::from_slice(&plaintext).map_err(|e| {
            VeilError::VaultIo(format!(
                "corrupt record at offset {offset} (key fingerprint {}): {e}",
                hex(fingerprint)
            ))
        })
    }

    fn scan_records(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let end = inner.end;
        let mut pos = HEADER_LEN;

        while pos < end {
            if pos + RECORD_HEADER_LEN as u64 > end {
                return Err(self.corrupt_at(pos));
            }
            let mut header = [0u8; RECORD_HEADER_LEN];
            inner
                .file
                .seek(SeekFrom::Start(pos))
                .and_then(|_| inner.file.read_exact(&mut header))
                .map_err(|e| VeilError::VaultIo(format!("scan of {} failed: {e}", self.path.display())))?;

            let dir = header[0];
            let fingerprint: [u8; FINGERPRINT_LEN] =
                header[1..1 + FINGERPRINT_LEN].try_into().expect("16 bytes");
            let ct_len =
                u32::from_be_bytes(header[RECORD_HEADER_LEN - 4..].try_into().expect("4 bytes")) as u64;

            let record_end = pos + RECORD_HEADER_LEN as u64 + ct_len;
            if record_end > end {
                return Err(self.corrupt_at(pos));
            }

            match dir {
                DIR_FORWARD => inner.forward.insert(fingerprint, pos),
                DIR_REVERSE => inner.reverse.insert(fingerprint, pos),
                _ => return Err(self.corrupt_at(pos)),
            };
            pos = record_end;
        }
        Ok(())
    }

    // Decrypt one record so a wrong password fails at open, not mid-run
    fn verify_key(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(offset) = inner.forward.values().next().copied() {
            self.read_entry(&mut inner, offset)?;
        }
        Ok(())
    }

    fn corrupt_at(&self, offset: u64) -> VeilError {
        VeilError::VaultIo(format!(
            "corrupt record at offset {offset} in {}",
            self.path.display()
        ))
    }
}

fn open_file(path: &Path) -> Result<(File, u64, [u8; SALT_LEN], u32, bool)> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VeilError::VaultIo(format!("cannot create {}: {e}", parent.display())))?;
        }
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(|e| VeilError::VaultIo(format!("cannot open {}: {e}", path.display())))?;
    let len = file
        .metadata()
        .map_err(|e| VeilError::VaultIo(e.to_string()))?
        .len();

    if len == 0 {
        // Fresh vault: write the header
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&salt);
        header.extend_from_slice(&keys::PBKDF2_ITERATIONS.to_be_bytes());
        file.write_all(&header)
            .and_then(|_| file.sync_all())
            .map_err(|e| VeilError::VaultIo(format!("cannot initialize {}: {e}", path.display())))?;
        return Ok((file, HEADER_LEN, salt, keys::PBKDF2_ITERATIONS, true));
    }

    if len < HEADER_LEN {
        return Err(VeilError::VaultAuth(format!(
            "corrupt header in {}",
            path.display()
        )));
    }
    let mut header = [0u8; HEADER_LEN as usize];
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_exact(&mut header))
        .map_err(|e| VeilError::VaultIo(format!("cannot read header of {}: {e}", path.display())))?;

    if &header[..6] != MAGIC {
        return Err(VeilError::VaultAuth(format!(
            "corrupt header in {}: bad magic",
            path.display()
        )));
    }
    let salt: [u8; SALT_LEN] = header[6..6 + SALT_LEN].try_into().expect("16 bytes");
    let iterations = u32::from_be_bytes(header[6 + SALT_LEN..].try_into().expect("4 bytes"));
    if iterations == 0 {
        return Err(VeilError::VaultAuth(format!(
            "corrupt header in {}: zero KDF iterations",
            path.display()
        )));
    }

    Ok((file, len, salt, iterations, false))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
