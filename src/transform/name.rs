//! Name transformer: corpus draws per token, capitalization preserved

use super::{apply_case_mask, fit_letters, text, TransformContext};
use crate::domain::Result;

/// Replace each whitespace-separated token with a drawn name of the same
/// length and case pattern
///
/// Token position picks the corpus: first token from first names, final
/// token from last names, middle tokens from the neutral first-name pool.
/// Single-letter initials pass through; hyphens and apostrophes split a
/// token into independently drawn parts.
pub fn fake(ctx: &TransformContext<'_>, value: &str) -> Result<String> {
    let words: Vec<&str> = value.split_whitespace().collect();
    let word_count = words.len();

    let mut out = String::with_capacity(value.len());
    let mut word_index = 0;
    let mut rest = value;
    while let Some(pos) = rest.find(|c: char| !c.is_whitespace()) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let end = rest
            .find(char::is_whitespace)
            .unwrap_or(rest.len());
        let word = &rest[..end];
        out.push_str(&replace_word(ctx, word, word_index, word_count)?);
        word_index += 1;
        rest = &rest[end..];
    }
    out.push_str(rest);
    Ok(out)
}

fn replace_word(
    ctx: &TransformContext<'_>,
    word: &str,
    index: usize,
    count: usize,
) -> Result<String> {
    if word.chars().count() == 1 {
        // Initials stay
        return Ok(word.to_string());
    }

    let mut out = String::with_capacity(word.len());
    for (part_index, part) in word.split_inclusive(['-', '\'']).enumerate() {
        let (core, sep) = match part.strip_suffix(['-', '\'']) {
            Some(core) => (core, &part[core.len()..]),
            None => (part, ""),
        };
        if core.is_empty() {
            out.push_str(sep);
            continue;
        }
        if core.chars().all(char::is_alphabetic) {
            let corpus = if index + 1 == count && count > 1 {
                &ctx.corpora.last_names
            } else {
                &ctx.corpora.first_names
            };
            let material: &[&[u8]] = &[core.as_bytes(), &[index as u8, part_index as u8]];
            let drawn = ctx.draw(corpus, material);
            let fitted = fit_letters(ctx, drawn, core.chars().count(), material);
            out.push_str(&apply_case_mask(core, &fitted));
        } else {
            out.push_str(&text::fpe_text(ctx, core)?);
        }
        out.push_str(sep);
    }
    Ok(out)
}
