//! Core domain types: data types, modes and mapping entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic data type of a column, decided once per column by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Email addresses (`local@domain`)
    Email,
    /// Telephone numbers, optionally with a `+` country prefix
    Phone,
    /// Person names (1-4 title-case tokens)
    Name,
    /// RFC 4122 canonical UUIDs
    Uuid,
    /// Calendar dates in one of the supported templates
    Date,
    /// All-digit identifiers, leading zeros allowed
    NumericId,
    /// 13-19 digit Luhn-valid card numbers
    CreditCard,
    /// ISO 13616 IBANs with mod-97 check digits
    Iban,
    /// Street addresses
    Address,
    /// Bare domain names
    Domain,
    /// Anything else
    FreeText,
}

impl DataType {
    /// Stable tag used in vault records and serialized run parameters
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Name => "name",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::NumericId => "numeric_id",
            Self::CreditCard => "credit_card",
            Self::Iban => "iban",
            Self::Address => "address",
            Self::Domain => "domain",
            Self::FreeText => "free_text",
        }
    }

    /// Parse a tag back into a data type (used for per-column overrides)
    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "name" => Some(Self::Name),
            "uuid" | "guid" => Some(Self::Uuid),
            "date" => Some(Self::Date),
            "numeric_id" => Some(Self::NumericId),
            "credit_card" => Some(Self::CreditCard),
            "iban" => Some(Self::Iban),
            "address" => Some(Self::Address),
            "domain" => Some(Self::Domain),
            "free_text" => Some(Self::FreeText),
            _ => None,
        }
    }

    /// Types that hybrid mode routes through the FPE engine; the rest use
    /// fake-data draws
    pub fn is_fpe_native(&self) -> bool {
        matches!(
            self,
            Self::Phone | Self::NumericId | Self::CreditCard | Self::Iban | Self::Uuid | Self::Date
        )
    }
}

/// Anonymization mode selecting the transformer strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Synthetic replacements drawn from the bundled corpora
    Fake,
    /// Format-preserving encryption for every type
    Fpe,
    /// Keyed hash folded into the original's shape; not reversible, no vault
    Hmac,
    /// FPE for numeric-shaped types, fake draws for textual types
    Hybrid,
}

impl Mode {
    /// Stable tag used in serialized run parameters
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Fake => "fake",
            Self::Fpe => "fpe",
            Self::Hmac => "hmac",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "fake" => Some(Self::Fake),
            "fpe" => Some(Self::Fpe),
            "hmac" => Some(Self::Hmac),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Whether this mode stores mappings in the vault
    pub fn uses_vault(&self) -> bool {
        !matches!(self, Self::Hmac)
    }
}

/// One original-to-anonymized mapping, immutable once written to the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Column the value belongs to
    pub column: String,
    /// Original cell value
    pub original: String,
    /// Anonymized replacement
    pub anonymized: String,
    /// Data type tag the transformer ran under
    pub data_type: DataType,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl MappingEntry {
    pub fn new(
        column: impl Into<String>,
        original: impl Into<String>,
        anonymized: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            column: column.into(),
            original: original.into(),
            anonymized: anonymized.into(),
            data_type,
            created_at: Utc::now(),
        }
    }
}
