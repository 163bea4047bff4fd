//! Domain and free-text transformers, plus segment-level FPE for
//! arbitrary strings

use super::{apply_case_mask, TransformContext};
use crate::corpus::LengthBucket;
use crate::domain::Result;
use crate::format::{decompose, recompose, Alphabet, Segment};

/// Segment-by-segment FPE: every payload run is encrypted under its own
/// alphabet, literal characters never move
///
/// Segments containing characters outside their ASCII alphabet (non-ASCII
/// letters) pass through unchanged.
pub fn fpe_text(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let (shape, segments) = decompose(value);
    let cipher = ctx.cipher();

    let mut replaced = Vec::with_capacity(segments.len());
    for (i, segment) in segments.into_iter().enumerate() {
        let ascii = segment.text.chars().all(|c| segment.alphabet.contains(c));
        let text = if ascii {
            cipher.encrypt(&ctx.tweak(&[b"seg", &[i as u8]]), segment.alphabet, &segment.text)?
        } else {
            segment.text
        };
        replaced.push(Segment {
            alphabet: segment.alphabet,
            text,
        });
    }
    recompose(&shape, &replaced)
}

/// Domain-typed cell: the master-keyed domain map keeps domains stable
/// across every column
pub fn domain(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    domain_map(ctx, value)
}

/// Deterministic domain replacement keyed on the domain itself via the
/// master key: equal domains map identically everywhere
pub fn domain_map(ctx: &TransformContext<'_>, domain: &str) -> Result<String> {
    let mac_key = ctx.keys.domain_mac(&domain.to_lowercase());
    Ok(rebuild_domain(ctx, domain, &mac_key, &[]))
}

/// Independent fake domain keyed on the column and a diversifier (normally
/// the whole original value), used when domain preservation is off
pub fn fake_domain(ctx: &TransformContext<'_>, domain: &str, diversifier: &[u8]) -> Result<String> {
    let key = ctx.column_key;
    Ok(rebuild_domain(ctx, domain, &key, &[diversifier]))
}

fn rebuild_domain(
    ctx: &TransformContext<'_>,
    original: &str,
    key: &[u8; 32],
    extra: &[&[u8]],
) -> String {
    let labels: Vec<&str> = original.split('.').collect();
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    let has_tld = labels.len() >= 2;

    for (i, label) in labels.iter().enumerate() {
        if has_tld && i == labels.len() - 1 {
            // TLD preserved, known or not
            out.push(label.to_lowercase());
            continue;
        }
        let index = [i as u8];
        let mut material: Vec<&[u8]> = vec![label.as_bytes(), &index];
        material.extend_from_slice(extra);
        let drawn = if ctx.attempt == 0 {
            ctx.corpora.domain_bases.draw(key, &material)
        } else {
            let attempt = ctx.attempt.to_be_bytes();
            material.push(&attempt);
            ctx.corpora.domain_bases.draw(key, &material)
        };
        out.push(drawn.to_string());
    }

    if !has_tld {
        // Bare label without a TLD: attach one from the corpus
        let material: Vec<&[u8]> = vec![original.as_bytes()];
        out.push(ctx.corpora.tlds.draw(key, &material).to_string());
    }
    out.join(".")
}

/// Free text: whitespace tokenization, proper nouns become name draws,
/// plain words become bucket-matched word draws, digit runs are encrypted
pub fn fake_free_text(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut token_index = 0usize;
    let mut rest = value;

    while let Some(pos) = rest.find(|c: char| !c.is_whitespace()) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        out.push_str(&replace_token(ctx, &rest[..end], token_index)?);
        token_index += 1;
        rest = &rest[end..];
    }
    out.push_str(rest);
    Ok(out)
}

fn replace_token(ctx: &TransformContext<'_>, token: &str, index: usize) -> Result<String> {
    // Leading/trailing punctuation stays attached
    let start = token
        .find(|c: char| c.is_alphanumeric())
        .unwrap_or(token.len());
    let end = token
        .rfind(|c: char| c.is_alphanumeric())
        .map(|i| i + 1)
        .unwrap_or(start);
    let (head, rest) = token.split_at(start);
    let (core, tail) = rest.split_at(end - start);

    if core.is_empty() {
        return Ok(token.to_string());
    }

    let replaced = if core.bytes().all(|b| b.is_ascii_digit()) {
        ctx.cipher().encrypt(
            &ctx.tweak(&[b"text", &[index as u8]]),
            Alphabet::Digits,
            core,
        )?
    } else if core.chars().all(char::is_alphabetic) {
        let material: &[&[u8]] = &[core.as_bytes(), &[index as u8]];
        if core.chars().next().is_some_and(char::is_uppercase) {
            // Proper noun: replace with a name draw in the same style
            let drawn = ctx.draw(&ctx.corpora.first_names, material);
            style_word(core, drawn)
        } else {
            // Plain word: same length bucket
            let bucket = LengthBucket::of(core.chars().count());
            let drawn = ctx.draw(ctx.corpora.words(bucket), material);
            style_word(core, drawn)
        }
    } else {
        // Mixed alphanumeric token: per-segment FPE keeps the exact shape
        fpe_text(ctx, core)?
    };

    Ok(format!("{head}{replaced}{tail}"))
}

// Match the original token's case style without forcing its length
fn style_word(original: &str, drawn: &str) -> String {
    if original.chars().all(|c| !c.is_lowercase()) && original.chars().count() > 1 {
        drawn.to_uppercase()
    } else if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = drawn.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    } else {
        drawn.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpora;
    use crate::crypto::keys::KeySchedule;
    use crate::detector::Detection;
    use crate::domain::DataType;
    use crate::format::same_signature;

    struct Fixture {
        keys: KeySchedule,
        corpora: Corpora,
        detection: Detection,
    }

    fn fixture(data_type: DataType) -> Fixture {
        Fixture {
            keys: KeySchedule::from_seed(Some(b"example".as_slice())),
            corpora: Corpora::load().unwrap(),
            detection: Detection::overridden(data_type),
        }
    }

    impl Fixture {
        fn ctx(&self) -> TransformContext<'_> {
            self.ctx_for("notes")
        }

        fn ctx_for<'a>(&'a self, column: &'a str) -> TransformContext<'a> {
            TransformContext {
                column,
                column_key: self.keys.column_key(column),
                keys: &self.keys,
                corpora: &self.corpora,
                detection: &self.detection,
                preserve_domain: false,
                attempt: 0,
            }
        }
    }

    #[test]
    fn test_fpe_text_signature_strict() {
        let f = fixture(DataType::FreeText);
        for input in ["Acct-9921/B", "hello WORLD 42", "x"] {
            let out = fpe_text(&f.ctx(), input).unwrap();
            assert!(same_signature(input, &out), "{input:?} -> {out:?}");
            assert_ne!(out, input);
        }
    }

    #[test]
    fn test_domain_map_cohesion_across_columns() {
        let f = fixture(DataType::Domain);
        let a = domain_map(&f.ctx_for("email_a"), "gmail.com").unwrap();
        let b = domain_map(&f.ctx_for("email_b"), "gmail.com").unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with(".com"));
        assert_ne!(a, "gmail.com");
    }

    #[test]
    fn test_domain_label_count_and_tld() {
        let f = fixture(DataType::Domain);
        let out = domain(&f.ctx(), "tenant.onmicrosoft.com").unwrap();
        assert_eq!(out.split('.').count(), 3);
        assert!(out.ends_with(".com"));

        let bare = domain(&f.ctx(), "intranet").unwrap();
        assert_eq!(bare.split('.').count(), 2);
    }

    #[test]
    fn test_free_text_structure() {
        let f = fixture(DataType::FreeText);
        let input = "Call Anna about invoice 4471, thanks!";
        let out = fake_free_text(&f.ctx(), input).unwrap();

        assert_eq!(out.split(' ').count(), input.split(' ').count());
        assert!(out.ends_with('!'));
        assert!(out.contains(','));
        let digits: String = out.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(digits.len(), 4);
        assert_ne!(out, input);
    }

    #[test]
    fn test_free_text_length_buckets() {
        let f = fixture(DataType::FreeText);
        let out = fake_free_text(&f.ctx(), "cat finding extraordinary").unwrap();
        let words: Vec<&str> = out.split(' ').collect();
        assert!(words[0].len() <= 4, "short bucket: {}", words[0]);
        assert!((5..=8).contains(&words[1].len()), "medium bucket: {}", words[1]);
        assert!(words[2].len() >= 9, "long bucket: {}", words[2]);
    }

    #[test]
    fn test_free_text_proper_noun_stays_capitalized() {
        let f = fixture(DataType::FreeText);
        let out = fake_free_text(&f.ctx(), "met Anna today").unwrap();
        let second = out.split(' ').nth(1).unwrap();
        assert!(second.chars().next().unwrap().is_uppercase());
        assert!(out.split(' ').nth(2).unwrap().chars().all(|c| c.is_lowercase()));
    }
}
