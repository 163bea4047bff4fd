//! Encrypted persistent mapping vault
//!
//! Bidirectional (column, original) ↔ (column, anonymized) storage with
//! at-most-once mapping creation under concurrent writers.

pub mod store;

pub use store::{UpsertOutcome, Vault, VaultStatistics, MAGIC};
