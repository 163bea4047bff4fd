//! Regex prefilter rules and date format templates

use crate::domain::{Result, VeilError};
use crate::format::checksum;
use chrono::NaiveDate;
use regex::Regex;

/// Compiled match rules for the regex prefilter
pub struct RuleSet {
    uuid: Regex,
    email: Regex,
    iban: Regex,
    domain: Regex,
}

impl RuleSet {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| VeilError::Configuration(format!("invalid detector pattern: {e}")))
        };
        Ok(Self {
            uuid: compile(
                r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            )?,
            email: compile(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?,
            iban: compile(r"^[A-Z]{2}\d{2}[A-Z0-9]{10,30}$")?,
            domain: compile(r"^[a-z0-9.-]+\.[a-z]{2,}$")?,
        })
    }

    pub fn is_uuid(&self, value: &str) -> bool {
        self.uuid.is_match(value)
    }

    pub fn is_email(&self, value: &str) -> bool {
        self.email.is_match(value)
    }

    /// Optional leading `+`, 7-15 digits once punctuation is stripped, no
    /// letters anywhere
    pub fn is_phone(&self, value: &str) -> bool {
        if value.chars().any(|c| c.is_alphabetic()) {
            return false;
        }
        let trimmed = value.trim();
        let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let digits = rest.chars().filter(|c| c.is_ascii_digit()).count();
        (7..=15).contains(&digits)
            && rest
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '/'))
    }

    /// 13-19 digits after stripping punctuation, Luhn-valid
    pub fn is_credit_card(&self, value: &str) -> bool {
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        (13..=19).contains(&digits.len())
            && value.chars().all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-'))
            && checksum::luhn_valid(&digits)
    }

    /// IBAN shape after space-stripping and uppercasing, mod-97 valid
    pub fn is_iban(&self, value: &str) -> bool {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        self.iban.is_match(&compact) && checksum::iban_valid(&compact)
    }

    /// All digits, leading zeros allowed, length 3-20
    pub fn is_numeric_id(&self, value: &str) -> bool {
        (3..=20).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn is_domain(&self, value: &str) -> bool {
        self.domain.is_match(value)
    }
}

/// Date component order within a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    Ymd,
    Dmy,
    Mdy,
}

/// One fixed date format template
///
/// Table order is also the tie-break priority when two templates parse the
/// same number of samples.
#[derive(Debug, Clone, Copy)]
pub struct DateTemplate {
    pub id: &'static str,
    order: DateOrder,
    sep: char,
}

pub const DATE_TEMPLATES: [DateTemplate; 9] = [
    DateTemplate { id: "YYYY-MM-DD", order: DateOrder::Ymd, sep: '-' },
    DateTemplate { id: "DD/MM/YYYY", order: DateOrder::Dmy, sep: '/' },
    DateTemplate { id: "MM/DD/YYYY", order: DateOrder::Mdy, sep: '/' },
    DateTemplate { id: "YYYY/MM/DD", order: DateOrder::Ymd, sep: '/' },
    DateTemplate { id: "DD-MM-YYYY", order: DateOrder::Dmy, sep: '-' },
    DateTemplate { id: "MM-DD-YYYY", order: DateOrder::Mdy, sep: '-' },
    DateTemplate { id: "YYYY.MM.DD", order: DateOrder::Ymd, sep: '.' },
    DateTemplate { id: "DD.MM.YYYY", order: DateOrder::Dmy, sep: '.' },
    DateTemplate { id: "MM.DD.YYYY", order: DateOrder::Mdy, sep: '.' },
];

impl DateTemplate {
    pub fn by_id(id: &str) -> Option<&'static DateTemplate> {
        DATE_TEMPLATES.iter().find(|t| t.id == id)
    }

    /// Parse a value against this template, returning the date and any
    /// trailing suffix (time component), which is preserved verbatim
    pub fn parse<'v>(&self, value: &'v str) -> Option<(NaiveDate, &'v str)> {
        let bytes = value.as_bytes();
        if bytes.len() < 10 {
            return None;
        }
        let (y, m, d) = match self.order {
            DateOrder::Ymd => {
                if !(sep_at(bytes, 4, self.sep) && sep_at(bytes, 7, self.sep)) {
                    return None;
                }
                (num(value, 0, 4)?, num(value, 5, 2)?, num(value, 8, 2)?)
            }
            DateOrder::Dmy => {
                if !(sep_at(bytes, 2, self.sep) && sep_at(bytes, 5, self.sep)) {
                    return None;
                }
                let d = num(value, 0, 2)?;
                let m = num(value, 3, 2)?;
                (num(value, 6, 4)?, m, d)
            }
            DateOrder::Mdy => {
                if !(sep_at(bytes, 2, self.sep) && sep_at(bytes, 5, self.sep)) {
                    return None;
                }
                let m = num(value, 0, 2)?;
                let d = num(value, 3, 2)?;
                (num(value, 6, 4)?, m, d)
            }
        };

        let suffix = &value[10..];
        if !(suffix.is_empty() || suffix.starts_with('T') || suffix.starts_with(' ')) {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(y as i32, m, d)?;
        Some((date, suffix))
    }

    /// Render a date back in this template, re-attaching the suffix
    pub fn format(&self, date: NaiveDate, suffix: &str) -> String {
        use chrono::Datelike;
        let (y, m, d) = (date.year(), date.month(), date.day());
        let sep = self.sep;
        let body = match self.order {
            DateOrder::Ymd => format!("{y:04}{sep}{m:02}{sep}{d:02}"),
            DateOrder::Dmy => format!("{d:02}{sep}{m:02}{sep}{y:04}"),
            DateOrder::Mdy => format!("{m:02}{sep}{d:02}{sep}{y:04}"),
        };
        format!("{body}{suffix}")
    }
}

fn sep_at(bytes: &[u8], index: usize, sep: char) -> bool {
    bytes.get(index).copied() == Some(sep as u8)
}

fn num(value: &str, start: usize, len: usize) -> Option<u32> {
    let slice = value.get(start..start + len)?;
    if !slice.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    slice.parse().ok()
}
