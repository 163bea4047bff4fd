//! Column data-type detection
//!
//! A priority-ordered regex prefilter over a bounded sample of cells, then
//! name and address heuristics, then a free-text fallback. The winning rule's
//! match fraction becomes the confidence; per-type parameters (date template,
//! phone country code) ride along for the transformers.

pub mod heuristics;
pub mod rules;

use crate::corpus::Corpora;
use crate::domain::{DataType, Result, VeilError};
use rules::{DateTemplate, RuleSet, DATE_TEMPLATES};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum number of cells examined per column
pub const SAMPLE_LIMIT: usize = 1000;

/// Fraction of the sample a regex rule must match to win
const RULE_THRESHOLD: f32 = 0.8;
/// Fraction for the name heuristic
const NAME_THRESHOLD: f32 = 0.6;
/// Fraction for the address heuristic
const ADDRESS_THRESHOLD: f32 = 0.3;
/// Confidence boost when the column name hints at the detected type
const COLUMN_HINT_BOOST: f32 = 0.2;

/// Per-type parameters carried from detection into transformation
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DetectorParams {
    /// Winning date template id, e.g. `"YYYY-MM-DD"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_template: Option<String>,
    /// Country code digits after a leading `+`, when most samples carry one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Most common punctuation separator in phone samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<char>,
}

/// Result of classifying one column
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub data_type: DataType,
    pub confidence: f32,
    pub params: DetectorParams,
}

impl Detection {
    /// A detection forced by a user override
    pub fn overridden(data_type: DataType) -> Self {
        Self {
            data_type,
            confidence: 1.0,
            params: DetectorParams::default(),
        }
    }

    fn free_text(confidence: f32) -> Self {
        Self {
            data_type: DataType::FreeText,
            confidence,
            params: DetectorParams::default(),
        }
    }
}

/// Classifies columns from sampled cells and the column name
pub struct TypeDetector {
    rules: RuleSet,
    corpora: Arc<Corpora>,
}

impl TypeDetector {
    pub fn new(corpora: Arc<Corpora>) -> Result<Self> {
        Ok(Self {
            rules: RuleSet::new()?,
            corpora,
        })
    }

    /// Classify a column from up to [`SAMPLE_LIMIT`] non-null cells
    ///
    /// Returns [`VeilError::DetectorUndecided`] when the sample is empty;
    /// callers recover by falling back to free text.
    pub fn detect(&self, column: &str, samples: &[String]) -> Result<Detection> {
        let sample: Vec<&str> = samples
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .take(SAMPLE_LIMIT)
            .collect();
        if sample.is_empty() {
            return Err(VeilError::DetectorUndecided(column.to_string()));
        }
        let n = sample.len() as f32;

        let fraction = |pred: &dyn Fn(&str) -> bool| -> f32 {
            sample.iter().filter(|v| pred(v)).count() as f32 / n
        };

        // Priority-ordered prefilter; first rule over threshold wins.
        let candidates: [(DataType, f32); 8] = [
            (DataType::Uuid, fraction(&|v| self.rules.is_uuid(v))),
            (DataType::Email, fraction(&|v| self.rules.is_email(v))),
            (DataType::Phone, fraction(&|v| self.rules.is_phone(v))),
            (DataType::CreditCard, fraction(&|v| self.rules.is_credit_card(v))),
            (DataType::Iban, fraction(&|v| self.rules.is_iban(v))),
            (DataType::Date, self.date_fraction(&sample).1),
            (DataType::NumericId, fraction(&|v| self.rules.is_numeric_id(v))),
            (DataType::Domain, fraction(&|v| self.rules.is_domain(v))),
        ];

        for (data_type, frac) in candidates {
            if frac >= RULE_THRESHOLD {
                let params = match data_type {
                    DataType::Date => DetectorParams {
                        date_template: self.date_fraction(&sample).0.map(|t| t.id.to_string()),
                        ..Default::default()
                    },
                    DataType::Phone => phone_params(&sample),
                    _ => DetectorParams::default(),
                };
                let confidence = boost(frac, column_hint(column, data_type));
                return Ok(Detection {
                    data_type,
                    confidence,
                    params,
                });
            }
        }

        let name_frac = fraction(&heuristics::looks_like_name);
        if name_frac >= NAME_THRESHOLD {
            let hinted = heuristics::name_column_hint(column);
            return Ok(Detection {
                data_type: DataType::Name,
                confidence: boost(name_frac, hinted),
                params: DetectorParams::default(),
            });
        }

        let address_frac = fraction(&|v| heuristics::looks_like_address(v, &self.corpora));
        if address_frac >= ADDRESS_THRESHOLD {
            return Ok(Detection {
                data_type: DataType::Address,
                confidence: address_frac,
                params: DetectorParams::default(),
            });
        }

        Ok(Detection::free_text(0.3))
    }

    /// Plurality date template and the fraction of the sample it parses
    fn date_fraction(&self, sample: &[&str]) -> (Option<&'static DateTemplate>, f32) {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for value in sample {
            for (i, template) in DATE_TEMPLATES.iter().enumerate() {
                if template.parse(value).is_some() {
                    *counts.entry(i).or_insert(0) += 1;
                    break; // earliest matching template takes the vote
                }
            }
        }
        let winner = counts
            .iter()
            .max_by_key(|(&i, &count)| (count, std::cmp::Reverse(i)))
            .map(|(&i, &count)| (&DATE_TEMPLATES[i], count));
        match winner {
            Some((template, count)) => (Some(template), count as f32 / sample.len() as f32),
            None => (None, 0.0),
        }
    }
}

fn boost(fraction: f32, hinted: bool) -> f32 {
    if hinted {
        (fraction + COLUMN_HINT_BOOST).min(1.0)
    } else {
        fraction.min(1.0)
    }
}

/// Column-name hints lifted from typical header vocabularies; they only
/// raise confidence, never change the winning rule
fn column_hint(column: &str, data_type: DataType) -> bool {
    let lower = column.to_lowercase();
    let keywords: &[&str] = match data_type {
        DataType::Email => &["email", "e-mail", "mail"],
        DataType::Phone => &["phone", "tel", "mobile", "fax"],
        DataType::Date => &["date", "dob", "birth", "time"],
        DataType::Iban => &["iban", "account"],
        DataType::CreditCard => &["card", "credit", "cc"],
        DataType::Uuid => &["uuid", "guid"],
        DataType::NumericId => &["id", "number"],
        DataType::Domain => &["domain", "host", "site"],
        _ => return false,
    };
    keywords.iter().any(|kw| lower.contains(kw))
}

fn phone_params(sample: &[&str]) -> DetectorParams {
    let mut code_counts: HashMap<String, usize> = HashMap::new();
    let mut sep_counts: HashMap<char, usize> = HashMap::new();

    for value in sample {
        let trimmed = value.trim();
        if let Some(rest) = trimmed.strip_prefix('+') {
            let code: String = rest.chars().take_while(|c| c.is_ascii_digit()).take(3).collect();
            if !code.is_empty() {
                *code_counts.entry(code).or_insert(0) += 1;
            }
        }
        for c in trimmed.chars() {
            if !c.is_ascii_digit() && c != '+' && !c.is_whitespace() {
                *sep_counts.entry(c).or_insert(0) += 1;
            }
        }
    }

    let majority = sample.len() / 2;
    DetectorParams {
        date_template: None,
        country_code: code_counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .filter(|(_, count)| *count > majority)
            .map(|(code, _)| code),
        separator: sep_counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(sep, _)| sep),
    }
}
