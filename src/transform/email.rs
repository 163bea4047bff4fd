//! Email transformer: fake-name local parts, mapped or drawn domains

use super::{apply_case_mask, fit_letters, text, TransformContext};
use crate::domain::{Result, VeilError};

/// Replace the local part token by token with fake-name draws; the domain
/// follows the domain-preservation setting
pub fn fake(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let (local, domain) = split(value)?;

    let mut out = String::with_capacity(value.len());
    for piece in tokenize(local) {
        match piece {
            Piece::Separator(c) => out.push(c),
            Piece::Token(token) => out.push_str(&replace_token(ctx, token)?),
        }
    }
    out.push('@');
    out.push_str(&anonymize_side_domain(ctx, domain, value)?);
    Ok(out)
}

/// Segment-FPE the local part, keep the domain-preservation contract for the
/// domain
pub fn fpe(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let (local, domain) = split(value)?;
    let mut out = text::fpe_text(ctx, local)?;
    out.push('@');
    out.push_str(&anonymize_side_domain(ctx, domain, value)?);
    Ok(out)
}

fn anonymize_side_domain(
    ctx: &TransformContext<'_>,
    domain: &str,
    full_value: &str,
) -> Result<String> {
    if ctx.preserve_domain {
        // Same domain, same replacement, across all columns
        text::domain_map(ctx, domain)
    } else {
        // Keyed on the whole address so equal domains give no cohesion
        text::fake_domain(ctx, domain, full_value.as_bytes())
    }
}

fn split(value: &str) -> Result<(&str, &str)> {
    value
        .split_once('@')
        .filter(|(local, domain)| !local.is_empty() && !domain.is_empty())
        .ok_or_else(|| VeilError::FormatUnparseable {
            kind: "email",
            detail: format!("no local@domain split in {value:?}"),
        })
}

enum Piece<'a> {
    Token(&'a str),
    Separator(char),
}

// Local parts tokenize on '.' and '_'; other punctuation stays inside its
// token and is preserved positionally by the token replacement.
fn tokenize(local: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, c) in local.char_indices() {
        if c == '.' || c == '_' {
            if start < i {
                pieces.push(Piece::Token(&local[start..i]));
            }
            pieces.push(Piece::Separator(c));
            start = i + c.len_utf8();
        }
    }
    if start < local.len() {
        pieces.push(Piece::Token(&local[start..]));
    }
    pieces
}

fn replace_token(ctx: &TransformContext<'_>, token: &str) -> Result<String> {
    if token.chars().all(|c| c.is_ascii_alphabetic()) {
        let drawn = ctx.draw(&ctx.corpora.first_names, &[token.as_bytes()]);
        let fitted = fit_letters(ctx, drawn, token.chars().count(), &[token.as_bytes()]);
        Ok(apply_case_mask(token, &fitted))
    } else {
        // Digits or mixed content: encrypt per segment, shape intact
        text::fpe_text(ctx, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpora;
    use crate::crypto::keys::KeySchedule;
    use crate::detector::Detection;
    use crate::domain::DataType;
    use std::sync::Arc;

    fn fixture() -> (KeySchedule, Arc<Corpora>, Detection) {
        (
            KeySchedule::from_seed(Some(b"example".as_slice())),
            Arc::new(Corpora::load().unwrap()),
            Detection::overridden(DataType::Email),
        )
    }

    fn ctx<'a>(
        keys: &'a KeySchedule,
        corpora: &'a Corpora,
        detection: &'a Detection,
        preserve_domain: bool,
    ) -> TransformContext<'a> {
        TransformContext {
            column: "email",
            column_key: keys.column_key("email"),
            keys,
            corpora,
            detection,
            preserve_domain,
            attempt: 0,
        }
    }

    #[test]
    fn test_fake_email_shape() {
        let (keys, corpora, detection) = fixture();
        let ctx = ctx(&keys, &corpora, &detection, false);
        let out = fake(&ctx, "John.Smith@gmail.com").unwrap();

        assert_eq!(out.matches('@').count(), 1);
        let (local, domain) = out.split_once('@').unwrap();
        assert_eq!(local.matches('.').count(), 1);
        assert!(domain.contains('.'));
        assert_ne!(out, "John.Smith@gmail.com");

        // Local tokens keep length and title case
        let (a, b) = local.split_once('.').unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(b.len(), 5);
        assert!(a.chars().next().unwrap().is_uppercase());
        assert!(a.chars().skip(1).all(|c| c.is_lowercase()));
        assert!(b.chars().next().unwrap().is_uppercase());
    }

    #[test]
    fn test_fake_email_deterministic() {
        let (keys, corpora, detection) = fixture();
        let ctx = ctx(&keys, &corpora, &detection, false);
        assert_eq!(
            fake(&ctx, "John.Smith@gmail.com").unwrap(),
            fake(&ctx, "John.Smith@gmail.com").unwrap()
        );
    }

    #[test]
    fn test_domain_cohesion_with_preservation() {
        let (keys, corpora, detection) = fixture();
        let ctx = ctx(&keys, &corpora, &detection, true);
        let a = fake(&ctx, "alice@gmail.com").unwrap();
        let b = fake(&ctx, "bob@gmail.com").unwrap();
        assert_eq!(
            a.split_once('@').unwrap().1,
            b.split_once('@').unwrap().1
        );
        assert_ne!(a.split_once('@').unwrap().0, b.split_once('@').unwrap().0);
    }

    #[test]
    fn test_no_cohesion_without_preservation() {
        let (keys, corpora, detection) = fixture();
        let ctx = ctx(&keys, &corpora, &detection, false);
        // Keyed on the whole address, so equal input domains do not force
        // equal output domains
        let domains: std::collections::HashSet<String> =
            ["alice", "bob", "carol", "dave", "erin", "frank"]
                .iter()
                .map(|local| {
                    let out = fake(&ctx, &format!("{local}@gmail.com")).unwrap();
                    out.split_once('@').unwrap().1.to_string()
                })
                .collect();
        assert!(domains.len() > 1);
    }

    #[test]
    fn test_missing_at_sign_unparseable() {
        let (keys, corpora, detection) = fixture();
        let ctx = ctx(&keys, &corpora, &detection, false);
        assert!(matches!(
            fake(&ctx, "not-an-email").unwrap_err(),
            VeilError::FormatUnparseable { .. }
        ));
    }

    #[test]
    fn test_fpe_email_preserves_local_shape() {
        let (keys, corpora, detection) = fixture();
        let ctx = ctx(&keys, &corpora, &detection, false);
        let out = fpe(&ctx, "jo.smith42@corp.io").unwrap();
        let (local, _) = out.split_once('@').unwrap();
        assert_eq!(local.len(), "jo.smith42".len());
        assert_eq!(&local[2..3], ".");
        assert!(local[..2].chars().all(|c| c.is_ascii_lowercase()));
        assert!(local[8..10].chars().all(|c| c.is_ascii_digit()));
    }
}
