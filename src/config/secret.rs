//! Secret handling for seeds and vault passwords
//!
//! Wraps sensitive strings in `secrecy::Secret` so they are zeroed on drop
//! and redacted in Debug output. The anonymization seed and the vault
//! password never appear in logs or serialized run parameters.

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper implementing the traits `Secret` requires
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl SecretValue {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A secret string: zeroed on drop, redacted in Debug, explicit access only
pub type SecretString = Secret<SecretValue>;

/// Wrap a plain string as a secret
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Borrow a secret's bytes, e.g. for key derivation
#[inline]
pub fn secret_bytes(secret: &SecretString) -> &[u8] {
    secret.expose_secret().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expose() {
        let secret = secret_string("hunter2".to_string());
        assert_eq!(secret_bytes(&secret), b"hunter2");
    }

    #[test]
    fn test_debug_redacted() {
        let secret = secret_string("sensitive-seed".to_string());
        let debug = format!("{secret:?}");
        assert!(!debug.contains("sensitive-seed"));
    }

    #[test]
    fn test_serde_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            seed: SecretString,
        }
        let json = serde_json::to_string(&Wrapper {
            seed: secret_string("abc".to_string()),
        })
        .unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(secret_bytes(&back.seed), b"abc");
    }
}
