//! Bundled fake-data corpora and deterministic draws
//!
//! Corpora are static word lists embedded at compile time. A draw is an
//! HMAC of the corpus name and the original value, keyed on a column
//! sub-key, reduced modulo the corpus length, so the same (seed, column,
//! original) always yields the same replacement. Draws are not reversible;
//! reversal goes through the vault.

use crate::crypto::hmac_sha256;
use crate::domain::{Result, VeilError};
use anyhow::Context;
use std::collections::HashSet;

/// One immutable word list
pub struct Corpus {
    name: &'static str,
    entries: Vec<&'static str>,
}

impl Corpus {
    fn load(name: &'static str, raw: &'static str) -> Result<Self> {
        let entries: Vec<&'static str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if entries.is_empty() {
            return Err(VeilError::Configuration(format!(
                "corpus '{name}' is empty"
            )));
        }
        Ok(Self { name, entries })
    }

    fn from_entries(name: &'static str, entries: Vec<&'static str>) -> Result<Self> {
        if entries.is_empty() {
            return Err(VeilError::Configuration(format!(
                "corpus '{name}' is empty"
            )));
        }
        Ok(Self { name, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deterministic draw keyed on `key` and the given material
    pub fn draw(&self, key: &[u8; 32], material: &[&[u8]]) -> &'static str {
        let mut parts: Vec<&[u8]> = Vec::with_capacity(material.len() + 2);
        parts.push(self.name.as_bytes());
        parts.push(b"\x00");
        parts.extend_from_slice(material);
        let mac = hmac_sha256(key, &parts);
        let index = u64::from_be_bytes(mac[..8].try_into().expect("8 bytes")) as usize;
        self.entries[index % self.entries.len()]
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.entries.iter().any(|e| *e == candidate)
    }
}

/// Token length buckets used by the free-text transformer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBucket {
    /// 4 characters or fewer
    Short,
    /// 5 to 8 characters
    Medium,
    /// 9 characters or more
    Long,
}

impl LengthBucket {
    pub fn of(len: usize) -> Self {
        match len {
            0..=4 => Self::Short,
            5..=8 => Self::Medium,
            _ => Self::Long,
        }
    }
}

/// All bundled corpora, loaded once and shared immutably
pub struct Corpora {
    pub first_names: Corpus,
    pub last_names: Corpus,
    pub cities: Corpus,
    pub street_names: Corpus,
    pub street_types: Corpus,
    pub tlds: Corpus,
    pub domain_bases: Corpus,
    words_short: Corpus,
    words_medium: Corpus,
    words_long: Corpus,
    street_type_set: HashSet<String>,
    tld_set: HashSet<&'static str>,
}

impl Corpora {
    /// Load and validate the embedded corpora
    pub fn load() -> Result<Self> {
        let words = Corpus::load("words", include_str!("../../corpora/words.txt"))?;
        let buckets = |bucket: LengthBucket| -> Vec<&'static str> {
            words
                .entries
                .iter()
                .copied()
                .filter(|w| LengthBucket::of(w.len()) == bucket)
                .collect()
        };

        let street_types = Corpus::load("street_types", include_str!("../../corpora/street_types.txt"))?;
        let street_type_set = street_types
            .entries
            .iter()
            .map(|t| t.to_lowercase())
            .collect();

        let tlds = Corpus::load("tlds", include_str!("../../corpora/tlds.txt"))?;
        let tld_set = tlds.entries.iter().copied().collect();

        Ok(Self {
            first_names: Corpus::load("first_names", include_str!("../../corpora/first_names.txt"))?,
            last_names: Corpus::load("last_names", include_str!("../../corpora/last_names.txt"))?,
            cities: Corpus::load("cities", include_str!("../../corpora/cities.txt"))?,
            street_names: Corpus::load("street_names", include_str!("../../corpora/street_names.txt"))?,
            words_short: Corpus::from_entries("words_short", buckets(LengthBucket::Short))
                .context("short word bucket")
                .map_err(|e| VeilError::Configuration(e.to_string()))?,
            words_medium: Corpus::from_entries("words_medium", buckets(LengthBucket::Medium))
                .context("medium word bucket")
                .map_err(|e| VeilError::Configuration(e.to_string()))?,
            words_long: Corpus::from_entries("words_long", buckets(LengthBucket::Long))
                .context("long word bucket")
                .map_err(|e| VeilError::Configuration(e.to_string()))?,
            street_types,
            tlds,
            domain_bases: Corpus::load("domain_bases", include_str!("../../corpora/domain_bases.txt"))?,
            street_type_set,
            tld_set,
        })
    }

    /// Word corpus for a given token length bucket
    pub fn words(&self, bucket: LengthBucket) -> &Corpus {
        match bucket {
            LengthBucket::Short => &self.words_short,
            LengthBucket::Medium => &self.words_medium,
            LengthBucket::Long => &self.words_long,
        }
    }

    /// Whether a token is a recognized street type (case-insensitive,
    /// trailing period tolerated: "St." matches "St")
    pub fn is_street_type(&self, token: &str) -> bool {
        let trimmed = token.trim_end_matches('.');
        !trimmed.is_empty() && self.street_type_set.contains(&trimmed.to_lowercase())
    }

    /// Whether a TLD is in the bundled list
    pub fn is_known_tld(&self, tld: &str) -> bool {
        self.tld_set.contains(tld)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_minimum_sizes() {
        let corpora = Corpora::load().unwrap();
        assert!(corpora.first_names.len() >= 1000);
        assert!(corpora.last_names.len() >= 1000);
        assert!(corpora.cities.len() >= 500);
        assert!(corpora.street_types.len() >= 30);
        assert!(corpora.tlds.len() >= 10);
        assert!(!corpora.words(LengthBucket::Long).is_empty());
    }

    #[test]
    fn test_draw_deterministic() {
        let corpora = Corpora::load().unwrap();
        let key = [9u8; 32];
        let a = corpora.first_names.draw(&key, &[b"John"]);
        let b = corpora.first_names.draw(&key, &[b"John"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_key_and_material_sensitivity() {
        let corpora = Corpora::load().unwrap();
        // With >1000 entries, two draws colliding across many probes would
        // indicate the key or material is being ignored.
        let hits = (0..32)
            .filter(|i| {
                let key_a = [*i as u8; 32];
                let key_b = [(*i as u8).wrapping_add(1); 32];
                corpora.first_names.draw(&key_a, &[b"x"]) == corpora.first_names.draw(&key_b, &[b"x"])
            })
            .count();
        assert!(hits < 4);
    }

    #[test]
    fn test_street_type_recognition() {
        let corpora = Corpora::load().unwrap();
        assert!(corpora.is_street_type("Street"));
        assert!(corpora.is_street_type("st"));
        assert!(corpora.is_street_type("Ave"));
        assert!(corpora.is_street_type("Blvd."));
        assert!(!corpora.is_street_type("Banana"));
    }

    #[test]
    fn test_length_buckets() {
        assert_eq!(LengthBucket::of(3), LengthBucket::Short);
        assert_eq!(LengthBucket::of(4), LengthBucket::Short);
        assert_eq!(LengthBucket::of(5), LengthBucket::Medium);
        assert_eq!(LengthBucket::of(8), LengthBucket::Medium);
        assert_eq!(LengthBucket::of(9), LengthBucket::Long);
    }
}
