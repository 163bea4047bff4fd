// Veil - Format-preserving data anonymization core
// Copyright (c) 2025 Veil Contributors
// Licensed under the MIT License

//! # Veil - Format-Preserving Data Anonymization
//!
//! Veil is the cryptographic core of a format-preserving data anonymization
//! engine: given a cell value and its column, it produces a synthetic
//! replacement that keeps the external shape of the original, is
//! deterministic under a shared secret seed, and can be reversed through an
//! encrypted mapping vault.
//!
//! ## Overview
//!
//! - **Detecting** a column's semantic type (email, phone, name, UUID,
//!   date, credit card, IBAN, numeric id, address, domain, free text) from
//!   regex rules and heuristics over a bounded sample
//! - **Transforming** values with per-type, shape-preserving strategies:
//!   corpus draws, Feistel FPE over small alphabets, or keyed-hash masking
//! - **Persisting** original ↔ anonymized mappings in an encrypted
//!   single-file vault so equal inputs map identically across files and runs
//! - **Deriving** all determinism from one master key: PBKDF2 over the user
//!   seed, HMAC sub-keys per column
//!
//! ## Architecture
//!
//! - [`engine`] - Coordinator: lookup-or-transform-and-store per cell
//! - [`detector`] - Column type detection with per-column caching
//! - [`transform`] - Per-type format-preserving transformers
//! - [`crypto`] - Key schedule and the FPE cipher
//! - [`vault`] - Encrypted persistent bidirectional mapping store
//! - [`corpus`] - Bundled fake-data corpora with deterministic draws
//! - [`format`] - Shape masks, signatures and check-digit algorithms
//! - [`domain`] - Core types and the error taxonomy
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use veil::config::{secret_string, VeilConfig};
//! use veil::engine::Engine;
//! use veil::domain::VeilError;
//!
//! fn main() -> Result<(), VeilError> {
//!     let mut config = VeilConfig::default();
//!     config.engine.seed = Some(secret_string("example".to_string()));
//!     config.vault.path = Some("out/mappings.vault".into());
//!     config.vault.password = Some(secret_string("pw".to_string()));
//!
//!     let engine = Engine::new(config)?;
//!
//!     // Prime the detector with a column sample, then anonymize cells
//!     engine.profile_column("email", &["john@corp.com".to_string()]);
//!     let replacement = engine.anonymize("email", "john@corp.com")?;
//!     assert_eq!(
//!         engine.deanonymize("email", &replacement)?.as_deref(),
//!         Some("john@corp.com")
//!     );
//!
//!     engine.flush()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Determinism
//!
//! With the same seed, password and vault, every `(column, value)` pair
//! anonymizes identically across processes and machines. Referential
//! relationships between datasets survive anonymization.

pub mod config;
pub mod corpus;
pub mod crypto;
pub mod detector;
pub mod domain;
pub mod engine;
pub mod format;
pub mod logging;
pub mod transform;
pub mod vault;

pub use domain::{DataType, MappingEntry, Mode, Result, VeilError};
pub use engine::{Engine, RunParameters};
