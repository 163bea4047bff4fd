//! Phone transformer: country prefix preserved, digit payload encrypted

use super::TransformContext;
use crate::domain::Result;
use crate::format::Alphabet;

/// Encrypt a phone number's digits in place
///
/// A leading `+` country group is preserved verbatim; every other digit run
/// is part of one FPE payload. Non-digit characters never move. Runs whose
/// original leading digit is non-zero keep a non-zero leading digit via
/// cycle-walking.
pub fn transform(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let chars: Vec<char> = value.chars().collect();
    let preserved = country_prefix_span(ctx, &chars);

    // Digit runs outside the preserved prefix form the payload
    let mut payload = String::new();
    let mut run_starts: Vec<(usize, char)> = Vec::new();
    let mut in_run = false;
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_digit() && !preserved.contains(&i) {
            if !in_run {
                run_starts.push((payload.len(), c));
                in_run = true;
            }
            payload.push(c);
        } else {
            in_run = false;
        }
    }
    if payload.is_empty() {
        return Ok(value.to_string());
    }

    let legal = move |candidate: &str| {
        run_starts.iter().all(|&(offset, original)| {
            original == '0' || candidate.as_bytes()[offset] != b'0'
        })
    };
    let encrypted = ctx.cipher().encrypt_until(
        &ctx.tweak(&[b"phone"]),
        Alphabet::Digits,
        &payload,
        legal,
    )?;

    let mut out = String::with_capacity(value.len());
    let mut next = encrypted.chars();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_digit() && !preserved.contains(&i) {
            out.push(next.next().expect("payload length matches"));
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

// Indices of the country-code digits to keep. The detector's country code
// wins when present; otherwise a short first digit run after a leading '+'.
fn country_prefix_span(ctx: &TransformContext<'_>, chars: &[char]) -> std::ops::Range<usize> {
    let plus = match chars.iter().position(|&c| c == '+') {
        Some(i) if chars[..i].iter().all(|c| c.is_whitespace()) => i,
        _ => return 0..0,
    };
    let start = plus + 1;
    let run_len = chars[start..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .count();
    let keep = match &ctx.detection.params.country_code {
        Some(code) if run_len >= code.len() => code.len(),
        _ if run_len <= 3 => run_len,
        _ => 0,
    };
    start..start + keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpora;
    use crate::crypto::keys::KeySchedule;
    use crate::detector::{Detection, DetectorParams};
    use crate::domain::DataType;
    use crate::format::same_signature;

    fn fixture() -> (KeySchedule, Corpora) {
        (
            KeySchedule::from_seed(Some(b"example".as_slice())),
            Corpora::load().unwrap(),
        )
    }

    fn detection(country: Option<&str>) -> Detection {
        Detection {
            data_type: DataType::Phone,
            confidence: 1.0,
            params: DetectorParams {
                country_code: country.map(|c| c.to_string()),
                ..Default::default()
            },
        }
    }

    fn ctx<'a>(
        keys: &'a KeySchedule,
        corpora: &'a Corpora,
        detection: &'a Detection,
    ) -> TransformContext<'a> {
        TransformContext {
            column: "phone",
            column_key: keys.column_key("phone"),
            keys,
            corpora,
            detection,
            preserve_domain: false,
            attempt: 0,
        }
    }

    #[test]
    fn test_country_prefix_and_punctuation_preserved() {
        let (keys, corpora) = fixture();
        let detection = detection(Some("61"));
        let ctx = ctx(&keys, &corpora, &detection);
        let out = transform(&ctx, "+61-421-555-829").unwrap();

        assert!(out.starts_with("+61-"));
        assert_eq!(out.len(), "+61-421-555-829".len());
        assert!(same_signature("+61-421-555-829", &out));
        assert_eq!(out.chars().filter(char::is_ascii_digit).count(), 11);
        assert_ne!(out, "+61-421-555-829");
    }

    #[test]
    fn test_leading_nonzero_per_run() {
        let (keys, corpora) = fixture();
        let detection = detection(None);
        let ctx = ctx(&keys, &corpora, &detection);
        let out = transform(&ctx, "412 555 829").unwrap();
        for group in out.split(' ') {
            assert!(!group.starts_with('0'));
        }
    }

    #[test]
    fn test_zero_leading_run_unconstrained() {
        let (keys, corpora) = fixture();
        let detection = detection(None);
        let ctx = ctx(&keys, &corpora, &detection);
        // "(02)" has a zero-leading run; output shape must survive either way
        let out = transform(&ctx, "(02) 9999 8888").unwrap();
        assert!(same_signature("(02) 9999 8888", &out));
    }

    #[test]
    fn test_deterministic_and_no_digits_passthrough() {
        let (keys, corpora) = fixture();
        let detection = detection(None);
        let ctx = ctx(&keys, &corpora, &detection);
        assert_eq!(
            transform(&ctx, "0412345678").unwrap(),
            transform(&ctx, "0412345678").unwrap()
        );
        assert_eq!(transform(&ctx, "---").unwrap(), "---");
    }
}
