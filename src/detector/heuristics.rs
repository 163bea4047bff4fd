//! Name and address heuristics applied when the regex prefilter is
//! inconclusive

use crate::corpus::Corpora;

/// Common English function words that disqualify a token from being a name
const STOPWORDS: [&str; 40] = [
    "the", "and", "for", "with", "from", "this", "that", "are", "was", "has",
    "have", "had", "not", "but", "all", "any", "can", "her", "his", "its",
    "our", "out", "you", "were", "will", "would", "there", "their", "they",
    "than", "then", "when", "what", "where", "which", "your", "about", "into",
    "over", "after",
];

/// 1-4 whitespace-separated tokens, each title-case, alphabetic, length
/// 2-20, none in the stoplist
pub fn looks_like_name(value: &str) -> bool {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() > 4 {
        return false;
    }
    tokens.iter().all(|token| {
        let len = token.chars().count();
        if !(2..=20).contains(&len) {
            return false;
        }
        let mut chars = token.chars();
        let first_upper = chars.next().is_some_and(|c| c.is_uppercase());
        first_upper
            && token.chars().all(|c| c.is_alphabetic() || c == '-')
            && !STOPWORDS.contains(&token.to_lowercase().as_str())
    })
}

/// Whether a column name suggests person names; worth a confidence boost
pub fn name_column_hint(column: &str) -> bool {
    let lower = column.to_lowercase();
    ["name", "user", "customer", "employee", "person"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// A cell that carries a recognized street-type token next to a digit run
pub fn looks_like_address(value: &str, corpora: &Corpora) -> bool {
    let has_street_type = value
        .split_whitespace()
        .any(|token| corpora.is_street_type(token.trim_matches(|c: char| c == ',')));
    has_street_type && value.chars().any(|c| c.is_ascii_digit())
}
