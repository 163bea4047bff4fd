//! Per-type format-preserving transformers
//!
//! Four strategies mirror the anonymization modes: fake draws from corpora,
//! format-preserving encryption, keyed-hash masking, and the hybrid
//! dispatcher that routes numeric-shaped types through FPE and textual types
//! through fake draws. All strategies are pure functions of the column
//! sub-key and the input value; retries perturb the tweak, never state.

pub mod address;
pub mod date;
pub mod email;
pub mod hmac_mask;
pub mod name;
pub mod number;
pub mod phone;
pub mod text;
pub mod uuid;

use crate::corpus::{Corpora, Corpus};
use crate::crypto::fpe::FpeCipher;
use crate::crypto::keys::KeySchedule;
use crate::crypto::hmac_sha256;
use crate::detector::Detection;
use crate::domain::{DataType, Result};

/// Everything a transformer needs for one cell
pub struct TransformContext<'a> {
    pub column: &'a str,
    pub column_key: [u8; 32],
    pub keys: &'a KeySchedule,
    pub corpora: &'a Corpora,
    pub detection: &'a Detection,
    pub preserve_domain: bool,
    /// Collision retry counter; 0 on the first attempt
    pub attempt: u32,
}

impl TransformContext<'_> {
    pub(crate) fn cipher(&self) -> FpeCipher {
        FpeCipher::new(self.column_key)
    }

    /// FPE tweak: column name, a direction byte, per-call context, and the
    /// retry counter when this is a collision retry
    pub(crate) fn tweak(&self, context: &[&[u8]]) -> Vec<u8> {
        let mut tweak = Vec::with_capacity(self.column.len() + 8);
        tweak.extend_from_slice(self.column.as_bytes());
        tweak.push(0x00);
        for part in context {
            tweak.extend_from_slice(part);
        }
        if self.attempt > 0 {
            tweak.extend_from_slice(&self.attempt.to_be_bytes());
        }
        tweak
    }

    /// Corpus draw keyed on the column sub-key, perturbed by the retry
    /// counter
    pub(crate) fn draw(&self, corpus: &Corpus, material: &[&[u8]]) -> &'static str {
        if self.attempt == 0 {
            return corpus.draw(&self.column_key, material);
        }
        let attempt = self.attempt.to_be_bytes();
        let mut parts: Vec<&[u8]> = material.to_vec();
        parts.push(&attempt);
        corpus.draw(&self.column_key, &parts)
    }
}

/// One anonymization strategy
pub trait Transformer: Send + Sync {
    /// Produce a shape-preserving candidate for `value`
    fn transform(&self, ctx: &TransformContext<'_>, value: &str) -> Result<String>;
}

/// Synthetic replacements drawn from the bundled corpora
pub struct FakeTransformer;

impl Transformer for FakeTransformer {
    fn transform(&self, ctx: &TransformContext<'_>, value: &str) -> Result<String> {
        match ctx.detection.data_type {
            DataType::Email => email::fake(ctx, value),
            DataType::Phone => phone::transform(ctx, value),
            DataType::Name => name::fake(ctx, value),
            DataType::Uuid => uuid::transform(ctx, value),
            DataType::Date => date::transform(ctx, value),
            DataType::NumericId => number::numeric_id(ctx, value),
            DataType::CreditCard => number::credit_card(ctx, value),
            DataType::Iban => number::iban(ctx, value),
            DataType::Address => address::fake(ctx, value),
            DataType::Domain => text::domain(ctx, value),
            DataType::FreeText => text::fake_free_text(ctx, value),
        }
    }
}

/// Format-preserving encryption for every type; textual values are
/// encrypted segment by segment under their own alphabets
pub struct FpeTransformer;

impl Transformer for FpeTransformer {
    fn transform(&self, ctx: &TransformContext<'_>, value: &str) -> Result<String> {
        match ctx.detection.data_type {
            DataType::Phone => phone::transform(ctx, value),
            DataType::Uuid => uuid::transform(ctx, value),
            DataType::Date => date::transform(ctx, value),
            DataType::NumericId => number::numeric_id(ctx, value),
            DataType::CreditCard => number::credit_card(ctx, value),
            DataType::Iban => number::iban(ctx, value),
            DataType::Email => email::fpe(ctx, value),
            DataType::Domain => text::domain(ctx, value),
            _ => text::fpe_text(ctx, value),
        }
    }
}

/// Keyed hash folded into the original's format signature; never stored,
/// never reversible
pub struct HmacTransformer;

impl Transformer for HmacTransformer {
    fn transform(&self, ctx: &TransformContext<'_>, value: &str) -> Result<String> {
        Ok(hmac_mask::mask(ctx, value))
    }
}

/// FPE for `phone|numeric_id|credit_card|iban|uuid|date`, fake draws for
/// the textual types
pub struct HybridTransformer {
    fake: FakeTransformer,
    fpe: FpeTransformer,
}

impl HybridTransformer {
    pub fn new() -> Self {
        Self {
            fake: FakeTransformer,
            fpe: FpeTransformer,
        }
    }
}

impl Default for HybridTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for HybridTransformer {
    fn transform(&self, ctx: &TransformContext<'_>, value: &str) -> Result<String> {
        if ctx.detection.data_type.is_fpe_native() {
            self.fpe.transform(ctx, value)
        } else {
            self.fake.transform(ctx, value)
        }
    }
}

/// Apply the per-position case pattern of `original` to `replacement`
///
/// Both strings must have the same char count; positions where the original
/// is not a letter keep the replacement char unchanged.
pub(crate) fn apply_case_mask(original: &str, replacement: &str) -> String {
    original
        .chars()
        .zip(replacement.chars())
        .map(|(o, r)| {
            if o.is_uppercase() {
                r.to_ascii_uppercase()
            } else if o.is_lowercase() {
                r.to_ascii_lowercase()
            } else {
                r
            }
        })
        .collect()
}

/// Deterministic lowercase letter stream for padding drawn words out to a
/// required length
pub(crate) fn letter_stream(key: &[u8; 32], material: &[&[u8]], len: usize) -> String {
    let mut out = String::with_capacity(len);
    let mut counter: u8 = 0;
    while out.len() < len {
        let counter_bytes = [counter];
        let mut parts: Vec<&[u8]> = vec![b"pad", b"\x00"];
        parts.extend_from_slice(material);
        parts.push(&counter_bytes);
        let mac = hmac_sha256(key, &parts);
        for byte in mac {
            if out.len() == len {
                break;
            }
            out.push((b'a' + byte % 26) as char);
        }
        counter = counter.wrapping_add(1);
    }
    out
}

/// Fit a drawn word to an exact letter count: truncate if long, pad with
/// deterministic letters if short
pub(crate) fn fit_letters(
    ctx: &TransformContext<'_>,
    drawn: &str,
    len: usize,
    material: &[&[u8]],
) -> String {
    let mut out: String = drawn
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .take(len)
        .collect();
    if out.len() < len {
        let pad = letter_stream(&ctx.column_key, material, len - out.len());
        out.push_str(&pad);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_case_mask() {
        assert_eq!(apply_case_mask("John", "carl"), "Carl");
        assert_eq!(apply_case_mask("JANE", "mona"), "MONA");
        assert_eq!(apply_case_mask("mcgee", "SMITH"), "smith");
    }

    #[test]
    fn test_letter_stream_deterministic() {
        let key = [5u8; 32];
        let a = letter_stream(&key, &[b"x"], 30);
        let b = letter_stream(&key, &[b"x"], 30);
        assert_eq!(a, b);
        assert_eq!(a.len(), 30);
        assert!(a.bytes().all(|b| b.is_ascii_lowercase()));
        assert_ne!(a, letter_stream(&key, &[b"y"], 30));
    }
}
