//! UUID transformer: per-segment hex FPE, dashes and case preserved

use super::TransformContext;
use crate::domain::{Result, VeilError};
use crate::format::Alphabet;

pub fn transform(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return Err(VeilError::FormatUnparseable {
            kind: "uuid",
            detail: format!("non-hex content in {value:?}"),
        });
    }

    let cipher = ctx.cipher();
    let mut segments = Vec::new();
    for (i, segment) in value.split('-').enumerate() {
        if segment.is_empty() {
            return Err(VeilError::FormatUnparseable {
                kind: "uuid",
                detail: "empty segment".to_string(),
            });
        }
        let lowered = segment.to_ascii_lowercase();
        let encrypted = cipher.encrypt(
            &ctx.tweak(&[b"uuid", &[i as u8]]),
            Alphabet::LowerHex,
            &lowered,
        )?;
        // Hex case is a segment-level property: a segment written in
        // uppercase stays uppercase, everything else stays lowercase
        let uppercase = segment.chars().any(|c| c.is_ascii_uppercase())
            && !segment.chars().any(|c| c.is_ascii_lowercase());
        segments.push(if uppercase {
            encrypted.to_ascii_uppercase()
        } else {
            encrypted
        });
    }
    Ok(segments.join("-"))
}
