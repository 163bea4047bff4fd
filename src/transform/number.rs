//! Numeric identifier transformers: plain ids, credit cards, IBANs

use super::TransformContext;
use crate::domain::{Result, VeilError};
use crate::format::{checksum, Alphabet};

/// FPE over the digit payload; formatting characters stay in place
///
/// When the original does not start with zero the output is held to the
/// same rule by cycle-walking, so realistic identifiers stay realistic.
/// Zero-led originals keep their full domain (leading zeros allowed).
pub fn numeric_id(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Ok(value.to_string());
    }

    let constrain = !digits.starts_with('0');
    let legal = move |candidate: &str| !constrain || !candidate.starts_with('0');
    let encrypted = ctx.cipher().encrypt_until(
        &ctx.tweak(&[b"numeric"]),
        Alphabet::Digits,
        &digits,
        legal,
    )?;
    Ok(splice_digits(value, &encrypted))
}

/// Encrypt all but the last digit, then recompute the Luhn check digit
pub fn credit_card(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(13..=19).contains(&digits.len()) {
        return Err(VeilError::FormatUnparseable {
            kind: "credit_card",
            detail: format!("{} digits", digits.len()),
        });
    }

    let payload = &digits[..digits.len() - 1];
    let constrain = !payload.starts_with('0');
    let legal = move |candidate: &str| !constrain || !candidate.starts_with('0');
    let mut encrypted = ctx.cipher().encrypt_until(
        &ctx.tweak(&[b"card"]),
        Alphabet::Digits,
        payload,
        legal,
    )?;
    encrypted.push(checksum::luhn_check_digit(&encrypted));
    Ok(splice_digits(value, &encrypted))
}

/// Preserve the country code, encrypt the BBAN over the alphanumeric
/// alphabet, recompute the ISO 7064 check digits
pub fn iban(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let compact: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let valid_shape = compact.len() >= 14
        && compact[..2].bytes().all(|b| b.is_ascii_uppercase())
        && compact[2..4].bytes().all(|b| b.is_ascii_digit());
    if !valid_shape {
        return Err(VeilError::FormatUnparseable {
            kind: "iban",
            detail: format!("no country/check prefix in {value:?}"),
        });
    }

    let country = &compact[..2];
    let bban = &compact[4..];
    let encrypted_bban =
        ctx.cipher()
            .encrypt(&ctx.tweak(&[b"iban"]), Alphabet::UpperAlnum, bban)?;
    let check = checksum::iban_check_digits(country, &encrypted_bban);
    let replacement = format!("{country}{check}{encrypted_bban}");

    // Splice back over the alphanumeric positions, keeping any grouping
    // whitespace; original lowercase positions stay lowercase
    let mut next = replacement.chars();
    Ok(value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                let r = next.next().expect("replacement length matches");
                if c.is_ascii_lowercase() {
                    r.to_ascii_lowercase()
                } else {
                    r
                }
            } else {
                c
            }
        })
        .collect())
}

fn splice_digits(value: &str, digits: &str) -> String {
    let mut next = digits.chars();
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                next.next().expect("digit count matches")
            } else {
                c
            }
        })
        .collect()
}
